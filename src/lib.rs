//! Learning dynamics of policy hill climbing (PHC), win-or-learn-fast PHC and
//! win-or-learn-fast infinitesimal gradient ascent in repeated two-player
//! zero-sum games.

pub mod agent;
pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod gradient;
pub mod learner;
pub mod manager;
pub mod model;
pub mod stats;
pub mod utils;

pub use agent::{DiscreteAgent, Exploration, StepRule};
pub use engine::RepeatedGameEngine;
pub use error::GameError;
pub use gradient::{GradientDynamicsSolver, GradientParams};
pub use learner::Learner;
