/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub planned: usize,
    pub answered: usize,
    pub correct: u32,
    pub remaining: usize,
    pub is_complete: bool,
}
