use serde::{Deserialize, Serialize};
use std::fmt;

/// Observable or model variable of an epidemic record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variable {
    Susceptible,
    Confirmed,
    Infected,
    Fatal,
    Recovered,
    #[serde(rename = "Fatal or Recovered")]
    FatalOrRecovered,
    Vaccinated,
    Exposed,
    Waiting,
}

impl Variable {
    pub const ALL: [Variable; 9] = [
        Variable::Susceptible,
        Variable::Confirmed,
        Variable::Infected,
        Variable::Fatal,
        Variable::Recovered,
        Variable::FatalOrRecovered,
        Variable::Vaccinated,
        Variable::Exposed,
        Variable::Waiting,
    ];

    /// Variables compared by default when scoring a simulation.
    pub const SCORED: [Variable; 3] = [Variable::Infected, Variable::Fatal, Variable::Recovered];

    pub const fn as_str(self) -> &'static str {
        match self {
            Variable::Susceptible => "Susceptible",
            Variable::Confirmed => "Confirmed",
            Variable::Infected => "Infected",
            Variable::Fatal => "Fatal",
            Variable::Recovered => "Recovered",
            Variable::FatalOrRecovered => "Fatal or Recovered",
            Variable::Vaccinated => "Vaccinated",
            Variable::Exposed => "Exposed",
            Variable::Waiting => "Waiting",
        }
    }

    /// Whether records carry the variable. Model-only compartments start at 0.
    pub const fn is_observed(self) -> bool {
        !matches!(self, Variable::Vaccinated | Variable::Exposed | Variable::Waiting)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == name)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
