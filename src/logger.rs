use colored::{Color, ColoredString, Colorize};
use log::{Level, LevelFilter};

/// Modules whose records describe search decisions.
const SEARCH_TARGETS: &[&str] = &["refsyn::explorer"];

/// Modules whose records trace the constraint pipeline.
const CONSTRAINT_TARGETS: &[&str] = &[
    "refsyn::simplify",
    "refsyn::lower",
    "refsyn::solver",
    "refsyn::mocks",
];

/// Separate levels for search decisions and for constraint traces. The
/// constraint pipeline logs on every solve step, so it is usually kept
/// quieter than the search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Verbosity {
    pub search: LevelFilter,
    pub constraints: LevelFilter,
}

impl Verbosity {
    pub fn uniform(level: LevelFilter) -> Verbosity {
        Verbosity {
            search: level,
            constraints: level,
        }
    }

    pub fn search_only(level: LevelFilter) -> Verbosity {
        Verbosity {
            search: level,
            constraints: LevelFilter::Warn.min(level),
        }
    }

    fn max(&self) -> LevelFilter {
        self.search.max(self.constraints)
    }
}

pub fn base(verbosity: Verbosity) -> fern::Dispatch {
    let dispatch = SEARCH_TARGETS
        .iter()
        .fold(fern::Dispatch::new().level(verbosity.max()), |d, t| {
            d.level_for(*t, verbosity.search)
        });
    CONSTRAINT_TARGETS
        .iter()
        .fold(dispatch, |d, t| d.level_for(*t, verbosity.constraints))
}

/// The module a record came from, without the crate prefix.
fn concern(target: &str) -> &str {
    target.strip_prefix("refsyn::").unwrap_or(target)
}

pub fn stderr(base: fern::Dispatch) -> fern::Dispatch {
    base.format(move |out, message, record| {
        let level = record.level();
        let color = match level {
            Level::Error => Color::Red,
            Level::Warn => Color::Yellow,
            Level::Info => Color::Blue,
            Level::Debug => Color::Magenta,
            Level::Trace => Color::Green,
        };
        out.finish(format_args!(
            "{} [{}] {}",
            ColoredString::from((level.to_string().to_lowercase() + ":").as_str())
                .color(color)
                .to_string(),
            concern(record.target()),
            message
        ))
    })
    .chain(std::io::stderr())
}

/// Installs the stderr logger. Fails if a logger is already installed.
pub fn init(verbosity: Verbosity) -> Result<(), log::SetLoggerError> {
    stderr(base(verbosity)).apply()
}
