//! `portal_patterns`: search portal exports for link patterns and print them
//! as DrawTools JSON.
//!
//! Logs go to stderr so `--output -` keeps stdout clean for piping.

mod config;
mod drawtools;
mod portals;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use portal_patterns::homogeneous::{field_portal_count, HomogeneousMode};
use portal_patterns::parallel::default_num_workers;
use portal_patterns::portal::{find_portal_by_lat_lng, merge_duplicate_portals, parse_lat_lng};
use portal_patterns::{
    deepest_homogeneous, largest_cobweb, largest_double_herringbone, largest_flip_field,
    largest_herringbone, largest_three_corner, longest_drone_flight, CobwebCfg, DroneFlightCfg,
    FlipFieldCfg, HerringboneCfg, HomogeneousCfg, Portal, PortalIndex, PortalLimit,
    TriangleScorer,
};
use tracing::info;
use tracing_subscriber::fmt::SubscriberBuilder;

use crate::config::Config;
use crate::drawtools::DrawTools;

#[derive(Parser)]
#[command(name = "portal_patterns", version)]
#[command(about = "Find link patterns over a set of portals")]
struct Cmd {
    /// Worker threads for the per-root searches (default: available cores)
    #[arg(long = "num_workers", global = true)]
    num_workers: Option<usize>,

    /// Where to write the DrawTools JSON; `-` is stdout
    #[arg(long, global = true, default_value = "-")]
    output: String,

    /// Log search progress
    #[arg(short = 'P', long, global = true)]
    progress: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Longest cobweb (each portal inside the triangle of the previous three)
    Cobweb(CornerArgs),
    /// Longest herringbone over one base
    Herringbone(BaseArgs),
    /// Herringbone on both sides of one base
    #[command(name = "double_herringbone")]
    DoubleHerringbone(BaseArgs),
    /// Longest nested chain over three coloured portal lists
    #[command(name = "three_corners")]
    ThreeCorners(ThreeCornersArgs),
    /// Backbone path plus the portals that can link to all of it
    #[command(name = "flip_field")]
    FlipField(FlipFieldArgs),
    /// Deepest homogeneous field
    #[command(alias = "homogenous")]
    Homogeneous(HomogeneousArgs),
    /// Longest drone flight
    #[command(name = "drone_flight")]
    DroneFlight(DroneFlightArgs),
}

#[derive(Args)]
struct CornerArgs {
    /// Portal files (.json or .csv)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Pin a corner portal by "lat,lng" (up to three)
    #[arg(long = "corner")]
    corners: Vec<String>,
}

#[derive(Args)]
struct BaseArgs {
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Pin a base portal by "lat,lng" (up to two)
    #[arg(long = "base")]
    base: Vec<String>,
}

#[derive(Args)]
struct ThreeCornersArgs {
    /// One portal file per corner colour
    #[arg(num_args = 3, required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Args)]
struct FlipFieldArgs {
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Backbone size: `N` for exactly N portals, `<=N` for at most N
    #[arg(long = "num_backbone_portals", default_value = "16", value_parser = parse_backbone_limit)]
    num_backbone_portals: BackboneLimit,
    /// Cap on flip portals; 0 means no cap
    #[arg(long = "max_flip_portals", default_value_t = 0)]
    max_flip_portals: usize,
    /// Require the backbone to sweep monotonically around its first portal
    #[arg(long = "simple_backbone")]
    simple_backbone: bool,
}

#[derive(Args)]
#[command(group(ArgGroup::new("scorer").args(["largest_area", "smallest_area", "most_equilateral", "random"])))]
struct HomogeneousArgs {
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    #[arg(long = "corner")]
    corners: Vec<String>,
    #[arg(long = "max_depth", default_value_t = 6)]
    max_depth: u16,
    /// Prefer midpoints far from the sides of their triangle
    #[arg(long, conflicts_with_all = ["pure", "scorer"])]
    pretty: bool,
    /// Only fields that use every portal inside the root triangle
    #[arg(long)]
    pure: bool,
    #[arg(long = "largest_area")]
    largest_area: bool,
    #[arg(long = "smallest_area")]
    smallest_area: bool,
    #[arg(long = "most_equilateral")]
    most_equilateral: bool,
    /// Pick uniformly among equally deep roots
    #[arg(long)]
    random: bool,
    /// Seed for `--random`
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

#[derive(Args)]
struct DroneFlightArgs {
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Pin the first portal of the flight by "lat,lng"
    #[arg(long)]
    start: Option<String>,
    /// Pin the last portal of the flight by "lat,lng"
    #[arg(long)]
    end: Option<String>,
    /// Allow key-assisted jumps of up to 1250 m
    #[arg(long = "use_long_jumps")]
    use_long_jumps: bool,
    /// Minimise jumps instead of the number of keys needed
    #[arg(long = "optimize_jumps")]
    optimize_jumps: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BackboneLimit {
    max: usize,
    limit: PortalLimit,
}

fn parse_backbone_limit(text: &str) -> Result<BackboneLimit, String> {
    let (limit, digits) = match text.trim().strip_prefix("<=") {
        Some(rest) => (PortalLimit::LessEqual, rest),
        None => (PortalLimit::Equal, text.trim()),
    };
    let max: usize = digits
        .trim()
        .parse()
        .map_err(|_| format!("expected N or <=N, got {text:?}"))?;
    if max < 2 {
        return Err(format!("backbone needs at least 2 portals, got {max}"));
    }
    Ok(BackboneLimit { max, limit })
}

/// Per-invocation state: persisted config and global options.
struct Session {
    config: Config,
    config_path: Option<PathBuf>,
    config_dirty: bool,
    num_workers: usize,
    progress: bool,
}

impl Session {
    /// Load and merge every input file into one portal list.
    fn load(&mut self, inputs: &[PathBuf]) -> Result<Vec<Portal>> {
        let mut all = Vec::new();
        for input in inputs {
            let path = self.config.resolve_input(input);
            all.extend(portals::load_portals(&path)?);
            self.config_dirty |= self.config.remember_input(&path);
        }
        if inputs.len() > 1 {
            all = merge_duplicate_portals(all).context("merging input files")?;
        }
        Ok(all)
    }

    fn reporter(&self) -> impl FnMut(u32, u32) + Send {
        let enabled = self.progress;
        move |done, total| {
            if enabled {
                info!(done, total, "progress");
            }
        }
    }

    fn save_config(&self) {
        if !self.config_dirty {
            return;
        }
        if let Some(path) = &self.config_path {
            if let Err(err) = self.config.save(path) {
                tracing::warn!("could not save config: {err:#}");
            }
        }
    }
}

fn pin(portals: &[Portal], text: &str) -> Result<PortalIndex> {
    let lat_lng = parse_lat_lng(text)?;
    match find_portal_by_lat_lng(portals, lat_lng) {
        Some(index) => Ok(index),
        None => bail!("no portal at {text}"),
    }
}

fn pins(portals: &[Portal], texts: &[String], max: usize, what: &str) -> Result<Vec<PortalIndex>> {
    if texts.len() > max {
        bail!("at most {max} {what} portals can be pinned, got {}", texts.len());
    }
    texts.iter().map(|t| pin(portals, t)).collect()
}

fn scorer(args: &HomogeneousArgs) -> TriangleScorer {
    if args.largest_area {
        TriangleScorer::LargestArea
    } else if args.smallest_area {
        TriangleScorer::SmallestArea
    } else if args.most_equilateral {
        TriangleScorer::MostEquilateral
    } else if args.random {
        TriangleScorer::Random { seed: args.seed }
    } else {
        TriangleScorer::Arbitrary
    }
}

fn run(session: &mut Session, action: Action) -> Result<DrawTools> {
    let mut progress = session.reporter();
    let num_workers = session.num_workers;
    let dt = match action {
        Action::Cobweb(args) => {
            let portals = session.load(&args.inputs)?;
            let cfg = CobwebCfg {
                fixed_corners: pins(&portals, &args.corners, 3, "corner")?,
            };
            let cobweb = largest_cobweb(&portals, &cfg, &mut progress)?;
            info!(portals = cobweb.len(), "cobweb");
            drawtools::cobweb(&portals, &cobweb)
        }
        Action::Herringbone(args) => {
            let portals = session.load(&args.inputs)?;
            let cfg = HerringboneCfg {
                fixed_base: pins(&portals, &args.base, 2, "base")?,
                num_workers,
            };
            let hb = largest_herringbone(&portals, &cfg, &mut progress)?;
            info!(backbone = hb.backbone.len(), "herringbone");
            drawtools::herringbone(&portals, &hb)
        }
        Action::DoubleHerringbone(args) => {
            let portals = session.load(&args.inputs)?;
            let cfg = HerringboneCfg {
                fixed_base: pins(&portals, &args.base, 2, "base")?,
                num_workers,
            };
            let hb = largest_double_herringbone(&portals, &cfg, &mut progress)?;
            info!(ccw = hb.ccw.len(), cw = hb.cw.len(), "double herringbone");
            drawtools::double_herringbone(&portals, &hb)
        }
        Action::ThreeCorners(args) => {
            let mut lists = Vec::with_capacity(3);
            for input in &args.inputs {
                lists.push(session.load(std::slice::from_ref(input))?);
            }
            let [a, b, c] = lists.as_slice() else {
                bail!("three_corners needs exactly three portal files");
            };
            let lists = [a.as_slice(), b.as_slice(), c.as_slice()];
            let field = largest_three_corner(lists, &mut progress)?;
            info!(
                portals = field.portals.len(),
                color_changes = field.color_changes,
                "three corners"
            );
            drawtools::three_corners(lists, &field)
        }
        Action::FlipField(args) => {
            let portals = session.load(&args.inputs)?;
            let cfg = FlipFieldCfg {
                max_backbone_portals: args.num_backbone_portals.max,
                num_portal_limit: args.num_backbone_portals.limit,
                max_flip_portals: args.max_flip_portals,
                simple_backbone: args.simple_backbone,
                num_workers,
            };
            let field = largest_flip_field(&portals, &cfg, &mut progress)?;
            info!(
                backbone = field.backbone.len(),
                flips = field.flip_portals.len(),
                "flip field"
            );
            drawtools::flip_field(&portals, &field)
        }
        Action::Homogeneous(args) => {
            let portals = session.load(&args.inputs)?;
            let mode = if args.pure {
                HomogeneousMode::Pure
            } else if args.pretty {
                HomogeneousMode::Pretty
            } else {
                HomogeneousMode::Deepest
            };
            let cfg = HomogeneousCfg {
                max_depth: args.max_depth,
                mode,
                scorer: scorer(&args),
                fixed_corners: pins(&portals, &args.corners, 3, "corner")?,
                num_workers,
            };
            let field = deepest_homogeneous(&portals, &cfg, &mut progress)?;
            info!(
                depth = field.depth,
                portals = field_portal_count(field.depth),
                "homogeneous"
            );
            drawtools::homogeneous(&portals, &field)
        }
        Action::DroneFlight(args) => {
            let portals = session.load(&args.inputs)?;
            let cfg = DroneFlightCfg {
                start: args.start.as_deref().map(|s| pin(&portals, s)).transpose()?,
                end: args.end.as_deref().map(|s| pin(&portals, s)).transpose()?,
                use_long_jumps: args.use_long_jumps,
                optimize_num_keys: !args.optimize_jumps,
                num_workers,
            };
            let flight = longest_drone_flight(&portals, &cfg, &mut progress)?;
            info!(
                route = flight.route.len(),
                keys = flight.keys_needed.len(),
                distance_m = flight.distance_m,
                "drone flight"
            );
            drawtools::drone_flight(&portals, &flight)
        }
    };
    Ok(dt)
}

fn write_output(output: &str, dt: &DrawTools) -> Result<()> {
    let json = dt.to_json();
    if output == "-" {
        println!("{json}");
        return Ok(());
    }
    let path = Path::new(output);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "wrote drawtools");
    Ok(())
}

fn main() -> Result<()> {
    SubscriberBuilder::default()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    let cmd = Cmd::parse();
    let config_path = config::default_path();
    let config = config_path.as_deref().map(Config::load).unwrap_or_default();
    let mut session = Session {
        config,
        config_path,
        config_dirty: false,
        num_workers: cmd.num_workers.unwrap_or_else(default_num_workers).max(1),
        progress: cmd.progress,
    };
    let dt = run(&mut session, cmd.action)?;
    write_output(&cmd.output, &dt)?;
    session.save_config();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cmd::command().debug_assert();
    }

    #[test]
    fn backbone_limit_forms() {
        assert_eq!(
            parse_backbone_limit("12").unwrap(),
            BackboneLimit { max: 12, limit: PortalLimit::Equal }
        );
        assert_eq!(
            parse_backbone_limit("<=7").unwrap(),
            BackboneLimit { max: 7, limit: PortalLimit::LessEqual }
        );
        assert!(parse_backbone_limit("1").is_err());
        assert!(parse_backbone_limit("<7").is_err());
    }

    #[test]
    fn homogenous_alias_and_scorers() {
        let cmd = Cmd::try_parse_from([
            "portal_patterns",
            "homogenous",
            "park.csv",
            "--largest_area",
            "--max_depth",
            "4",
        ])
        .unwrap();
        let Action::Homogeneous(args) = cmd.action else {
            panic!("expected homogeneous");
        };
        assert_eq!(args.max_depth, 4);
        assert_eq!(scorer(&args), TriangleScorer::LargestArea);

        assert!(Cmd::try_parse_from([
            "portal_patterns",
            "homogeneous",
            "park.csv",
            "--largest_area",
            "--random",
        ])
        .is_err());
        assert!(Cmd::try_parse_from([
            "portal_patterns",
            "homogeneous",
            "park.csv",
            "--pretty",
            "--pure",
        ])
        .is_err());
    }

    #[test]
    fn global_options_follow_the_subcommand() {
        let cmd = Cmd::try_parse_from([
            "portal_patterns",
            "drone_flight",
            "a.json",
            "--num_workers",
            "3",
            "-P",
            "--use_long_jumps",
        ])
        .unwrap();
        assert_eq!(cmd.num_workers, Some(3));
        assert!(cmd.progress);
        assert_eq!(cmd.output, "-");
    }

    #[test]
    fn three_corners_takes_three_files() {
        assert!(Cmd::try_parse_from(["portal_patterns", "three_corners", "a.csv", "b.csv"]).is_err());
        assert!(
            Cmd::try_parse_from(["portal_patterns", "three_corners", "a.csv", "b.csv", "c.csv"])
                .is_ok()
        );
    }

    #[test]
    fn pins_resolve_by_location() {
        let portals = vec![
            Portal::new("a", "A", portal_patterns::LatLng::new(52.0, 21.0)),
            Portal::new("b", "B", portal_patterns::LatLng::new(52.001, 21.002)),
        ];
        assert_eq!(pin(&portals, "52.001,21.002").unwrap(), PortalIndex(1));
        assert!(pin(&portals, "10,10").is_err());
        let too_many = vec!["52,21".to_string(); 3];
        assert!(pins(&portals, &too_many, 2, "base").is_err());
    }

    #[test]
    fn end_to_end_cobweb_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("portals.csv");
        std::fs::write(
            &input,
            "a,A,0.0,0.0\nb,B,0.0,0.01\nc,C,0.01,0.005\nd,D,0.003,0.005\n",
        )
        .unwrap();
        let mut session = Session {
            config: Config::default(),
            config_path: None,
            config_dirty: false,
            num_workers: 1,
            progress: false,
        };
        let action = Action::Cobweb(CornerArgs {
            inputs: vec![input],
            corners: Vec::new(),
        });
        let dt = run(&mut session, action).unwrap();
        assert_eq!(dt.len(), 1);
        assert!(session.config_dirty);
        let out = dir.path().join("out").join("cobweb.json");
        write_output(out.to_str().unwrap(), &dt).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.starts_with("[{\"type\":\"polyline\",\"latLngs\":["));
        // Triangle plus one interior portal: 1,0,2,1,3,2.
        assert_eq!(text.matches("\"lat\"").count(), 6);
    }
}
