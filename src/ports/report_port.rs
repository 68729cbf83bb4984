//! Report output port.

use crate::domain::error::OptitraderError;
use crate::domain::universe::UniverseReport;

pub trait ReportPort {
    fn write(&self, report: &UniverseReport) -> Result<(), OptitraderError>;
}
