pub mod state_machine;

pub use state_machine::{MissionEvent, MissionStateMachine, Transition};
