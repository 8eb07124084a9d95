mod types;

pub use types::{
    EnvOverrides, LoadScenarioKind, ScenarioConfig, StressConfig, StressScenarioKind,
};
