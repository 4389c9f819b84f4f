use crate::cli::DemoArgs;
use crate::error::Result;
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use rigidff::{EnergyTerm, ForceField, SpatialForce};
use tracing::info;

const CC_LENGTH: f64 = 1.526;
const CH_LENGTH: f64 = 1.09;
const HCC_ANGLE_DEG: f64 = 109.5;

/// Builds an ethane molecule split across two rigid bodies, one methyl
/// group each, with AMBER-flavored parameters. The dihedral between the
/// groups is controlled entirely by the body configurations at evaluation
/// time.
pub fn build_ethane() -> Result<ForceField> {
    let mut field = ForceField::new();

    // Classes and charged types. Methyl hydrogens carry a small positive
    // charge balanced by the carbon.
    field.define_atom_class(0, "CT", 6, 4, 1.908, 0.1094)?;
    field.define_atom_class(1, "HC", 1, 1, 1.487, 0.0157)?;
    field.define_charged_atom_type(0, "methyl C", 0, -0.18)?;
    field.define_charged_atom_type(1, "methyl H", 1, 0.06)?;

    field.define_bond_stretch(0, 0, 310.0, CC_LENGTH)?;
    field.define_bond_stretch(0, 1, 340.0, CH_LENGTH)?;
    field.define_bond_bend(1, 0, 0, 50.0, HCC_ANGLE_DEG)?;
    field.define_bond_bend(1, 0, 1, 35.0, HCC_ANGLE_DEG)?;
    field.define_bond_torsion(1, 0, 0, 1, &[(3, 0.15, 0.0)])?;

    // One methyl per body. The carbons sit at the body origins; each
    // body's carbon bonds to the other body's carbon along x.
    let tilt = HCC_ANGLE_DEG.to_radians();
    let mut carbons = Vec::new();
    for body in 0..2usize {
        let cluster = field.create_cluster(&format!("methyl {body}"));
        let carbon = field.add_atom(0)?;
        field.place_atom_in_cluster(carbon, cluster, Point3::origin())?;

        // The C-C bond leaves body 0 along +x and body 1 along -x; the
        // hydrogens fan out on the opposite side.
        let axis_sign = if body == 0 { 1.0 } else { -1.0 };
        for i in 0..3 {
            let phi = 2.0 * std::f64::consts::PI * i as f64 / 3.0;
            let station = Point3::new(
                -axis_sign * CH_LENGTH * tilt.cos().abs(),
                CH_LENGTH * tilt.sin() * phi.cos(),
                CH_LENGTH * tilt.sin() * phi.sin(),
            );
            let hydrogen = field.add_atom(1)?;
            field.place_atom_in_cluster(hydrogen, cluster, station)?;
            field.add_bond(carbon, hydrogen)?;
        }
        field.attach_cluster_to_body(cluster, body, Isometry3::identity())?;
        carbons.push(carbon);
    }
    field.add_bond(carbons[0], carbons[1])?;

    Ok(field)
}

/// Body configurations placing body 1 a C-C bond length down the x axis,
/// twisted about it by the requested dihedral.
pub fn body_transforms(dihedral_deg: f64) -> [Isometry3<f64>; 2] {
    [
        Isometry3::identity(),
        Isometry3::from_parts(
            Translation3::new(CC_LENGTH, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), dihedral_deg.to_radians()),
        ),
    ]
}

pub fn run(args: &DemoArgs) -> Result<()> {
    let mut field = build_ethane()?;
    info!(angle = args.angle, "evaluating ethane demo");

    let transforms = body_transforms(args.angle);
    let mut forces = vec![SpatialForce::default(); 2];
    let mut potential_energy = 0.0;
    let energy = field.evaluate(&transforms, &mut forces, &mut potential_energy)?;

    println!(
        "ethane, two methyl bodies, H-C-C-H dihedral {:.1} degrees",
        args.angle
    );
    println!();
    print_energy(&energy);
    println!();
    for (body, force) in forces.iter().enumerate() {
        println!(
            "body {body}: force ({:12.4}, {:12.4}, {:12.4})  torque ({:12.4}, {:12.4}, {:12.4})",
            force.force.x,
            force.force.y,
            force.force.z,
            force.torque.x,
            force.torque.y,
            force.torque.z,
        );
    }
    Ok(())
}

pub fn dump() -> Result<()> {
    let mut field = build_ethane()?;
    field.realize_topology()?;
    print!("{}", field.dump());
    Ok(())
}

fn print_energy(energy: &EnergyTerm) {
    println!("energy (Da A^2/ps^2):");
    println!("  stretch  {:14.6}", energy.stretch);
    println!("  bend     {:14.6}", energy.bend);
    println!("  torsion  {:14.6}", energy.torsion);
    println!("  vdW      {:14.6}", energy.vdw);
    println!("  Coulomb  {:14.6}", energy.coulomb);
    println!("  total    {:14.6}", energy.total());
}
