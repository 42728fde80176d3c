pub mod config;
pub mod controller;
pub mod reveal;
pub mod timer;

pub use config::ControllerOptions;
pub use controller::{
    ExchangeOutcome, SubmitRejected, WidgetController, WidgetNotice, APOLOGY_TEXT,
};
pub use reveal::{reveal_steps, RevealOutcome, RevealPacing, RevealStep, StreamingEngine};
pub use timer::ScheduledTask;
