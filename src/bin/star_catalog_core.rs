use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::{anyhow, Context};
use clap::{ArgMatches, Command};

use star_catalog_core::solver::{Constraints, FindMode, Solver, Tolerances};
use star_catalog_core::{Catalog, CatalogBuilder, CatalogObject, Htm, PlateObject, Schema};

mod cmdline {
    use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

    //fp add_catalog_arg
    pub fn add_catalog_arg(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("catalog")
                .long("catalog")
                .short('c')
                .required(true)
                .help("JSON, CSV or postcard file holding the catalog objects")
                .action(ArgAction::Set),
        )
    }
    pub fn catalog(matches: &ArgMatches) -> String {
        matches.get_one::<String>("catalog").unwrap().to_string()
    }

    //fp add_depth_arg
    pub fn add_depth_arg(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("depth")
                .long("depth")
                .help("Maximum HTM subdivision depth to build")
                .value_parser(value_parser!(u8))
                .default_value("8")
                .action(ArgAction::Set),
        )
    }
    pub fn depth(matches: &ArgMatches) -> u8 {
        *matches.get_one::<u8>("depth").unwrap()
    }

    //fp add_verbose_arg
    pub fn add_verbose_arg(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Report diagnostic counters as the query runs")
                .action(ArgAction::SetTrue),
        )
    }
    pub fn verbose(matches: &ArgMatches) -> bool {
        matches.get_flag("verbose")
    }

    //fp add_ra_arg
    pub fn add_ra_arg(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("ra")
                .long("ra")
                .help("Right ascension of the region centre, in degrees")
                .value_parser(value_parser!(f64))
                .default_value("0.0")
                .action(ArgAction::Set),
        )
    }
    pub fn ra(matches: &ArgMatches) -> f64 {
        matches.get_one::<f64>("ra").unwrap() * std::f64::consts::PI / 180.0
    }

    //fp add_dec_arg
    pub fn add_dec_arg(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("dec")
                .long("dec")
                .help("Declination of the region centre, in degrees")
                .value_parser(value_parser!(f64))
                .default_value("0.0")
                .action(ArgAction::Set),
        )
    }
    pub fn dec(matches: &ArgMatches) -> f64 {
        matches.get_one::<f64>("dec").unwrap() * std::f64::consts::PI / 180.0
    }

    //fp add_fov_arg
    pub fn add_fov_arg(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("fov")
                .long("fov")
                .help("Field of view to clip, in degrees")
                .value_parser(value_parser!(f64))
                .default_value("10.0")
                .action(ArgAction::Set),
        )
    }
    pub fn fov(matches: &ArgMatches) -> f64 {
        matches.get_one::<f64>("fov").unwrap() * std::f64::consts::PI / 180.0
    }

    //fp add_min_depth_arg
    pub fn add_min_depth_arg(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("min_depth")
                .long("min-depth")
                .help("Shallowest trixel depth a clip may return")
                .value_parser(value_parser!(u8))
                .default_value("0")
                .action(ArgAction::Set),
        )
    }
    pub fn min_depth(matches: &ArgMatches) -> u8 {
        *matches.get_one::<u8>("min_depth").unwrap()
    }

    //fp add_max_depth_arg
    pub fn add_max_depth_arg(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("max_depth")
                .long("max-depth")
                .help("Deepest trixel depth a clip may return (defaults to the mesh's own depth)")
                .value_parser(value_parser!(u8))
                .action(ArgAction::Set),
        )
    }
    pub fn max_depth(matches: &ArgMatches, mesh_depth: u8) -> u8 {
        matches.get_one::<u8>("max_depth").copied().unwrap_or(mesh_depth)
    }

    //fp add_dist_tol_arg
    pub fn add_dist_tol_arg(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("dist_tol")
                .long("dist-tol")
                .help("Distance matching tolerance, in pixels")
                .value_parser(value_parser!(f64))
                .default_value("2.0")
                .action(ArgAction::Set),
        )
    }
    pub fn dist_tol(matches: &ArgMatches) -> f64 {
        *matches.get_one::<f64>("dist_tol").unwrap()
    }

    //fp add_mag_tol_arg
    pub fn add_mag_tol_arg(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("mag_tol")
                .long("mag-tol")
                .help("Magnitude-difference matching tolerance")
                .value_parser(value_parser!(f64))
                .default_value("0.3")
                .action(ArgAction::Set),
        )
    }
    pub fn mag_tol(matches: &ArgMatches) -> f64 {
        *matches.get_one::<f64>("mag_tol").unwrap()
    }

    //fp add_pa_tol_arg
    pub fn add_pa_tol_arg(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("pa_tol")
                .long("pa-tol")
                .help("Position-angle matching tolerance, in degrees")
                .value_parser(value_parser!(f64))
                .default_value("3.0")
                .action(ArgAction::Set),
        )
    }
    pub fn pa_tol(matches: &ArgMatches) -> f64 {
        matches.get_one::<f64>("pa_tol").unwrap() * std::f64::consts::PI / 180.0
    }

    //fp add_constraint_args
    pub fn add_constraint_args(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("min_mag")
                .long("min-mag")
                .value_parser(value_parser!(f64))
                .help("Brightest magnitude the haystack will consider")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("max_mag")
                .long("max-mag")
                .value_parser(value_parser!(f64))
                .help("Faintest magnitude the haystack will consider")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("min_fov")
                .long("min-fov")
                .value_parser(value_parser!(f64))
                .help("Smallest field of view to accept, in degrees")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("max_fov")
                .long("max-fov")
                .value_parser(value_parser!(f64))
                .help("Largest field of view to accept, in degrees")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("min_dec")
                .long("min-dec")
                .value_parser(value_parser!(f64))
                .help("Lowest declination to accept, in degrees")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("max_dec")
                .long("max-dec")
                .value_parser(value_parser!(f64))
                .help("Highest declination to accept, in degrees")
                .action(ArgAction::Set),
        )
    }
    pub fn constraints(matches: &ArgMatches) -> star_catalog_core::solver::Constraints {
        let mut c = star_catalog_core::solver::Constraints::default();
        if let (Some(lo), Some(hi)) = (
            matches.get_one::<f64>("min_mag"),
            matches.get_one::<f64>("max_mag"),
        ) {
            c = c.with_mag_range(*lo, *hi);
        }
        if let (Some(lo), Some(hi)) = (
            matches.get_one::<f64>("min_fov"),
            matches.get_one::<f64>("max_fov"),
        ) {
            c = c.with_fov_range(lo * std::f64::consts::PI / 180.0, hi * std::f64::consts::PI / 180.0);
        }
        if let (Some(lo), Some(hi)) = (
            matches.get_one::<f64>("min_dec"),
            matches.get_one::<f64>("max_dec"),
        ) {
            c = c.with_dec_range(lo * std::f64::consts::PI / 180.0, hi * std::f64::consts::PI / 180.0);
        }
        c
    }

    //fp add_plate_arg
    pub fn add_plate_arg(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("plate")
                .long("plate")
                .short('p')
                .required(true)
                .help("JSON file holding the unlabeled plate detections")
                .action(ArgAction::Set),
        )
    }
    pub fn plate(matches: &ArgMatches) -> String {
        matches.get_one::<String>("plate").unwrap().to_string()
    }

    //fp add_all_arg
    pub fn add_all_arg(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("all")
                .long("all")
                .help("Keep searching for every solution instead of stopping at the first")
                .action(ArgAction::SetTrue),
        )
    }
    pub fn all(matches: &ArgMatches) -> bool {
        matches.get_flag("all")
    }

    //fp add_output_arg
    pub fn add_output_arg(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .required(true)
                .help("Snapshot file to write")
                .action(ArgAction::Set),
        )
    }
    pub fn output(matches: &ArgMatches) -> String {
        matches.get_one::<String>("output").unwrap().to_string()
    }

    //fp add_back_solve_arg
    pub fn add_back_solve_arg(cmd: Command) -> Command {
        cmd.arg(
            Arg::new("back_solve")
                .long("back-solve")
                .help("Derive a position and magnitude for every plate detection from the best solution")
                .action(ArgAction::SetTrue),
        )
    }
    pub fn back_solve(matches: &ArgMatches) -> bool {
        matches.get_flag("back_solve")
    }
}

fn main() -> Result<(), anyhow::Error> {
    let cmd = Command::new("star_catalog_core")
        .about("HTM-indexed star catalog: region search and asterism plate solving")
        .version("0.1.0");
    let cmd = cmdline::add_catalog_arg(cmd);
    let cmd = cmdline::add_depth_arg(cmd);
    let cmd = cmdline::add_verbose_arg(cmd);

    let mut region_subcmd = Command::new("region").about("List every object in a clipped region of the sky");
    region_subcmd = cmdline::add_ra_arg(region_subcmd);
    region_subcmd = cmdline::add_dec_arg(region_subcmd);
    region_subcmd = cmdline::add_fov_arg(region_subcmd);
    region_subcmd = cmdline::add_min_depth_arg(region_subcmd);
    region_subcmd = cmdline::add_max_depth_arg(region_subcmd);

    let mut nearest_subcmd = Command::new("nearest").about("Find the object nearest a position");
    nearest_subcmd = cmdline::add_ra_arg(nearest_subcmd);
    nearest_subcmd = cmdline::add_dec_arg(nearest_subcmd);

    let mut write_subcmd = Command::new("write").about("Write the catalog out as a postcard snapshot");
    write_subcmd = cmdline::add_output_arg(write_subcmd);

    let mut solve_subcmd = Command::new("solve").about("Plate-solve a set of unlabeled detections");
    solve_subcmd = cmdline::add_plate_arg(solve_subcmd);
    solve_subcmd = cmdline::add_ra_arg(solve_subcmd);
    solve_subcmd = cmdline::add_dec_arg(solve_subcmd);
    solve_subcmd = cmdline::add_fov_arg(solve_subcmd);
    solve_subcmd = cmdline::add_min_depth_arg(solve_subcmd);
    solve_subcmd = cmdline::add_max_depth_arg(solve_subcmd);
    solve_subcmd = cmdline::add_dist_tol_arg(solve_subcmd);
    solve_subcmd = cmdline::add_mag_tol_arg(solve_subcmd);
    solve_subcmd = cmdline::add_pa_tol_arg(solve_subcmd);
    solve_subcmd = cmdline::add_constraint_args(solve_subcmd);
    solve_subcmd = cmdline::add_all_arg(solve_subcmd);
    solve_subcmd = cmdline::add_back_solve_arg(solve_subcmd);

    let cmd = cmd
        .subcommand(region_subcmd)
        .subcommand(nearest_subcmd)
        .subcommand(write_subcmd)
        .subcommand(solve_subcmd);

    let matches = cmd.get_matches();

    let verbose = cmdline::verbose(&matches);
    let depth = cmdline::depth(&matches);
    let catalog_filename: PathBuf = cmdline::catalog(&matches).into();
    let catalog = load_catalog(&catalog_filename, depth)
        .with_context(|| format!("loading catalog {}", catalog_filename.display()))?;
    if verbose {
        eprintln!("loaded {} objects at mesh depth {}", catalog.len(), depth);
    }

    match matches.subcommand() {
        Some(("region", sub_matches)) => region(&catalog, sub_matches, verbose)?,
        Some(("nearest", sub_matches)) => nearest(&catalog, sub_matches)?,
        Some(("write", sub_matches)) => write_snapshot(&catalog, sub_matches)?,
        Some(("solve", sub_matches)) => solve(&catalog, sub_matches, verbose)?,
        _ => {
            println!("Catalog has {} objects", catalog.len());
        }
    }
    Ok(())
}

//fp load_catalog
/// Load a catalog's objects from a JSON array, a generic CSV dump, or a
/// postcard snapshot (picked by the file's extension), and locate each one
/// into a freshly built mesh of the given depth
fn load_catalog(path: &PathBuf, depth: u8) -> anyhow::Result<Catalog> {
    let mut has_csv = false;
    #[cfg(feature = "csv")]
    {
        has_csv = true;
    }
    let mut has_postcard = false;
    #[cfg(feature = "postcard")]
    {
        has_postcard = true;
    }

    match path.extension().and_then(|x| x.to_str()) {
        Some("json") => {
            let s = std::fs::read_to_string(path)?;
            let objects: Vec<CatalogObject> = serde_json::from_str(&s)?;
            let htm = Htm::build(depth)?;
            let mut builder = CatalogBuilder::new(htm, Schema::new());
            for object in objects {
                builder.insert_located(object)?;
            }
            Ok(builder.build()?)
        }
        Some("csv") => {
            if !has_csv {
                return Err(anyhow!(
                    "CSV support not built in; recompile with feature \"csv\""
                ));
            }
            #[cfg(feature = "csv")]
            {
                let f = std::fs::File::open(path)?;
                let schema = Schema::new();
                let objects = star_catalog_core::import_csv::read_objects(f, &schema)?;
                let htm = Htm::build(depth)?;
                let mut builder = CatalogBuilder::new(htm, schema);
                for object in objects {
                    builder.insert_located(object)?;
                }
                Ok(builder.build()?)
            }
            #[cfg(not(feature = "csv"))]
            unreachable!()
        }
        Some("pc") | Some("postcard") => {
            if !has_postcard {
                return Err(anyhow!(
                    "postcard support not built in; recompile with feature \"postcard\""
                ));
            }
            #[cfg(feature = "postcard")]
            {
                let bytes = std::fs::read(path)?;
                Ok(Catalog::from_postcard(&bytes)?)
            }
            #[cfg(not(feature = "postcard"))]
            unreachable!()
        }
        _ => Err(anyhow!("unknown extension on catalog {}", path.display())),
    }
}

fn write_snapshot(catalog: &Catalog, matches: &ArgMatches) -> anyhow::Result<()> {
    #[cfg(feature = "postcard")]
    {
        let output_filename: PathBuf = cmdline::output(matches).into();
        let bytes = catalog.to_postcard()?;
        std::fs::write(output_filename, bytes)?;
        Ok(())
    }
    #[cfg(not(feature = "postcard"))]
    {
        let _ = (catalog, matches);
        Err(anyhow!("postcard support not built in; recompile with feature \"postcard\""))
    }
}

fn region(catalog: &Catalog, matches: &ArgMatches, verbose: bool) -> anyhow::Result<()> {
    let ra = cmdline::ra(matches);
    let dec = cmdline::dec(matches);
    let fov = cmdline::fov(matches);
    let min_depth = cmdline::min_depth(matches);
    let max_depth = cmdline::max_depth(matches, catalog.htm().depth());

    let set = catalog.clip(ra, dec, fov, min_depth, max_depth)?;
    if verbose {
        eprintln!(
            "clipped {} trixels, {} objects",
            set.trixel_count(),
            set.object_count()
        );
    }
    for object in set.objects() {
        display_object(object);
    }
    Ok(())
}

fn nearest(catalog: &Catalog, matches: &ArgMatches) -> anyhow::Result<()> {
    let ra = cmdline::ra(matches);
    let dec = cmdline::dec(matches);
    match catalog.nearest_on_pos(ra, dec) {
        Some(object) => display_object(object),
        None => println!("catalog is empty"),
    }
    Ok(())
}

fn solve(catalog: &Catalog, matches: &ArgMatches, verbose: bool) -> anyhow::Result<()> {
    let plate_filename: PathBuf = cmdline::plate(matches).into();
    let s = std::fs::read_to_string(&plate_filename)
        .with_context(|| format!("reading plate file {}", plate_filename.display()))?;
    let plate_objects: Vec<PlateObject> = serde_json::from_str(&s)?;

    let ra = cmdline::ra(matches);
    let dec = cmdline::dec(matches);
    let fov = cmdline::fov(matches);
    let min_depth = cmdline::min_depth(matches);
    let max_depth = cmdline::max_depth(matches, catalog.htm().depth());
    let set = catalog.clip(ra, dec, fov, min_depth, max_depth)?;

    let tolerances = Tolerances::default()
        .with_dist(cmdline::dist_tol(matches))
        .with_mag(cmdline::mag_tol(matches))
        .with_pa(cmdline::pa_tol(matches));
    let constraints = cmdline::constraints(matches);
    let mode = if cmdline::all(matches) { FindMode::All } else { FindMode::First };

    let solver = Solver::new(&set, tolerances, constraints);
    let cancel = AtomicBool::new(false);
    let result = solver.solve(&plate_objects, mode, &cancel)?;

    if verbose {
        eprintln!(
            "{} primaries tried, {} raw solutions, {} kept",
            result.diagnostics.primaries_tried,
            result.diagnostics.raw_solutions,
            result.solutions.len()
        );
    }

    if result.solutions.is_empty() {
        return Err(anyhow!("no solution found"));
    }
    for solution in &result.solutions {
        println!(
            "divergence {:.4} (mag {:.3}, dist {:.3}, pa {:.3}) flip={} rad/px={:.6}",
            solution.divergence.total,
            solution.divergence.mag,
            solution.divergence.distance,
            solution.divergence.pa,
            solution.flip,
            solution.rad_per_pixel,
        );
        for object in &solution.objects {
            println!(
                "  id={} ra={:.6} dec={:.6} mag={:.2}",
                object.id,
                object.ra * 180.0 / std::f64::consts::PI,
                object.dec * 180.0 / std::f64::consts::PI,
                object.mag
            );
        }
    }

    if cmdline::back_solve(matches) {
        let best = &result.solutions[0];
        let back = solver.back_solve(best, &plate_objects);
        eprintln!("back-solve converged in {} rounds", back.rounds);
        for (i, stats) in back.reference_stats.iter().enumerate() {
            eprintln!(
                "  reference {i}: mag_sigma={:.3} pos_sigma={:.3} clipped={}",
                stats.mag_sigma, stats.pos_sigma, stats.clipped
            );
        }
        for position in &back.positions {
            println!(
                "plate ({:.1},{:.1}) -> ra={:.6} dec={:.6} mag={:.2}{}",
                position.plate.x,
                position.plate.y,
                position.ra * 180.0 / std::f64::consts::PI,
                position.dec * 180.0 / std::f64::consts::PI,
                position.mag,
                if position.is_reference { " (reference)" } else { "" }
            );
        }
    }
    Ok(())
}

fn display_object(object: &CatalogObject) {
    let id = object.id();
    let ra = object.ra() * 180.0 / std::f64::consts::PI;
    let dec = object.dec() * 180.0 / std::f64::consts::PI;
    let mag = object.mag();
    let designation = object.designation().unwrap_or("-");
    println!("{id:10} {designation:12} ra={ra:10.5} dec={dec:10.5} mag={mag:6.2}");
}
