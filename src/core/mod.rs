pub mod etl;
pub mod grouping;
pub mod pipeline;
pub mod salary;
pub mod stats;

pub use crate::domain::model::{ReportBundle, Vacancy, VacancyRecord};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
