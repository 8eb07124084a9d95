/// One breached threshold, as reported by the SLA evaluator (§4.7).
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub metric_name: String,
    pub observed: f64,
    pub threshold: f64,
}

/// Output of `sla::evaluate`: `pass` when `violations` is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub pass: bool,
    pub violations: Vec<Violation>,
}

impl Verdict {
    #[must_use]
    pub const fn passing() -> Self {
        Self {
            pass: true,
            violations: Vec::new(),
        }
    }
}
