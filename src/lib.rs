pub mod candidate;
pub mod config;
pub mod constraints;
pub mod env;
pub mod error;
pub mod explorer;
pub mod logger;
pub mod logic;
pub mod lower;
pub mod mocks;
pub mod program;
pub mod simplify;
pub mod solver;
pub mod state;
pub mod subst;
pub mod ty;
pub mod unify;

pub use config::{ExplorerParams, FixpointStrategy};
pub use error::{Explored, SynthError, SynthErrorKind};
pub use explorer::{synthesize, Explorer};
pub use program::{Goal, RProgram};
pub use solver::{ConstraintSolver, QualifierGenerator, QualifierGenerators};
