pub mod clock;
pub mod fx;
pub mod grid;
pub mod patterns;
pub mod scheduler;

pub use fx::{FxKind, StepFx};
pub use grid::{Cell, StepGrid};
pub use scheduler::{Direction, Scheduler, SchedulerMode};
