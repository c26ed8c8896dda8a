// single-worker communicator

/// A group of exactly one worker; every collective is the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl super::Comm for SerialComm {
    fn rank(&self) -> usize { 0 }
    fn size(&self) -> usize { 1 }
    fn barrier(&self) {}
    fn all_reduce(&self, x: f64) -> f64 {
        x
    }
    fn all_gather_usize(&self, x: usize) -> Vec<usize> {
        vec![x]
    }
    fn all_gather_f64(&self, local: &[f64]) -> Vec<f64> {
        local.to_vec()
    }
}
