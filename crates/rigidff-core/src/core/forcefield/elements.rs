//! The chemical element table.
//!
//! A small periodic subset is registered when a parameter set is created;
//! further elements can be defined by the caller. Masses are in Daltons,
//! colors are display defaults in RGB.

pub const GRAY: [f64; 3] = [0.5, 0.5, 0.5];
pub const GREEN: [f64; 3] = [0.0, 1.0, 0.0];
pub const BLUE: [f64; 3] = [0.0, 0.0, 1.0];
pub const RED: [f64; 3] = [1.0, 0.0, 0.0];
pub const MAGENTA: [f64; 3] = [1.0, 0.0, 1.0];
pub const YELLOW: [f64; 3] = [1.0, 1.0, 0.0];

/// A chemical element. Immutable after registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub atomic_number: usize,
    pub symbol: String,
    pub name: String,
    /// Atomic mass in Da (g/mol).
    pub mass: f64,
    pub default_color: [f64; 3],
}

impl Element {
    pub fn new(atomic_number: usize, symbol: &str, name: &str, mass: f64) -> Self {
        Self {
            atomic_number,
            symbol: symbol.to_string(),
            name: name.to_string(),
            mass,
            default_color: GRAY,
        }
    }

    pub fn with_color(mut self, color: [f64; 3]) -> Self {
        self.default_color = color;
        self
    }
}

/// The built-in subset of the periodic table, loaded at construction time.
pub(crate) fn builtin_elements() -> Vec<Element> {
    vec![
        Element::new(1, "H", "Hydrogen", 1.008).with_color(GREEN),
        Element::new(2, "He", "Helium", 4.003),
        Element::new(3, "Li", "Lithium", 6.941),
        Element::new(6, "C", "Carbon", 12.011).with_color(GRAY),
        Element::new(7, "N", "Nitrogen", 14.007).with_color(BLUE),
        Element::new(8, "O", "Oxygen", 15.999).with_color(RED),
        Element::new(9, "F", "Fluorine", 18.998),
        Element::new(10, "Ne", "Neon", 20.180),
        Element::new(11, "Na", "Sodium", 22.990),
        Element::new(12, "Mg", "Magnesium", 24.305),
        Element::new(14, "Si", "Silicon", 28.086),
        Element::new(15, "P", "Phosphorus", 30.974).with_color(MAGENTA),
        Element::new(16, "S", "Sulphur", 32.066).with_color(YELLOW),
        Element::new(17, "Cl", "Chlorine", 35.453),
        Element::new(18, "Ar", "Argon", 39.948),
        Element::new(19, "K", "Potassium", 39.098),
        Element::new(20, "Ca", "Calcium", 40.078),
        Element::new(26, "Fe", "Iron", 55.845),
        Element::new(29, "Cu", "Copper", 63.546),
        Element::new(30, "Zn", "Zinc", 65.390),
        Element::new(36, "Kr", "Krypton", 83.800),
        Element::new(47, "Ag", "Silver", 107.868),
        Element::new(53, "I", "Iodine", 126.904),
        Element::new(54, "Xe", "Xenon", 131.290),
        Element::new(79, "Au", "Gold", 196.967).with_color(YELLOW),
        Element::new(92, "U", "Uranium", 238.029),
    ]
}
