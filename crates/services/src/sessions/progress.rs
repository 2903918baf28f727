/// Aggregated view of quiz session progress, used by the front-end header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    /// 1-based position of the question being asked; equals `total` once complete.
    pub position: usize,
    pub total: usize,
    pub answered: usize,
    pub correct: usize,
    pub remaining: usize,
    pub is_complete: bool,
}
