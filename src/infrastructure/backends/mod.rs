pub mod problem_bank;

use crate::domain::models::BackendBox;

pub struct BackendManager {}

impl BackendManager {
    /// The problem bank API configured through `api-url`.
    pub fn get() -> BackendBox {
        return Box::<problem_bank::ProblemBank>::default();
    }
}
