use crate::{REG_ACCEL_CONFIG, REG_GYRO_CONFIG, REG_PWR_MGMT_2};

/// One write of the bring-up sequence
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BringUpStep {
    /// accelerometer full scale range
    AccelRange,
    /// gyroscope full scale range
    GyroRange,
    /// enable accelerometer and gyro
    PowerEnable,
}

impl BringUpStep {
    /// Steps in the order they are sent; power enable must come last
    pub const SEQUENCE: [BringUpStep; 3] = [
        BringUpStep::AccelRange,
        BringUpStep::GyroRange,
        BringUpStep::PowerEnable,
    ];

    /// The register this step writes
    pub fn register(&self) -> u8 {
        match self {
            Self::AccelRange => REG_ACCEL_CONFIG,
            Self::GyroRange => REG_GYRO_CONFIG,
            Self::PowerEnable => REG_PWR_MGMT_2,
        }
    }
}

/// Outcome of a single bring-up write
#[derive(Debug)]
pub struct StepOutcome<E> {
    pub step: BringUpStep,
    pub register: u8,
    pub value: u8,
    pub result: Result<(), E>,
}

/// Per-step outcomes of a best-effort bring-up, in the order sent.
///
/// A failed step does not stop the ones after it.
#[derive(Debug)]
pub struct BringUpReport<E> {
    steps: [StepOutcome<E>; 3],
}

impl<E> BringUpReport<E> {
    pub(crate) fn new(steps: [StepOutcome<E>; 3]) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[StepOutcome<E>] {
        &self.steps
    }

    /// True if every write was acknowledged
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome<E>> {
        self.steps.iter().filter(|s| s.result.is_err())
    }

    /// Collapse to the first failure, for callers that treat any failed
    /// write as a failed bring-up
    pub fn into_result(self) -> Result<(), E> {
        let [a, g, p] = self.steps;
        a.result?;
        g.result?;
        p.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(step: BringUpStep, result: Result<(), &'static str>) -> StepOutcome<&'static str> {
        StepOutcome {
            step,
            register: step.register(),
            value: 0,
            result,
        }
    }

    #[test]
    fn sequence_registers() {
        let regs: Vec<u8> = BringUpStep::SEQUENCE.iter().map(|s| s.register()).collect();
        assert_eq!(regs, vec![0x1C, 0x1B, 0x6C]);
    }

    #[test]
    fn first_failure_wins() {
        let report = BringUpReport::new([
            outcome(BringUpStep::AccelRange, Ok(())),
            outcome(BringUpStep::GyroRange, Err("gyro nak")),
            outcome(BringUpStep::PowerEnable, Err("power nak")),
        ]);

        assert!(!report.is_complete());
        let failed: Vec<BringUpStep> = report.failures().map(|s| s.step).collect();
        assert_eq!(failed, vec![BringUpStep::GyroRange, BringUpStep::PowerEnable]);
        assert_eq!(report.into_result(), Err("gyro nak"));
    }

    #[test]
    fn complete_report_is_ok() {
        let report = BringUpReport::new([
            outcome(BringUpStep::AccelRange, Ok(())),
            outcome(BringUpStep::GyroRange, Ok(())),
            outcome(BringUpStep::PowerEnable, Ok(())),
        ]);
        assert!(report.is_complete());
        assert_eq!(report.failures().count(), 0);
        assert_eq!(report.into_result(), Ok(()));
    }
}
