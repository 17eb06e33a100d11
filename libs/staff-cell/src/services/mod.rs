pub mod absence;
pub mod employee;

pub use absence::AbsenceService;
pub use employee::EmployeeService;
