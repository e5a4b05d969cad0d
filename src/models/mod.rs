pub mod admission;
pub mod annotation;
pub mod enums;
pub mod exam;
pub mod medication;
pub mod patient;

pub use admission::Admission;
pub use annotation::AnnotationRecord;
pub use enums::OrderOrigin;
pub use exam::ExamResult;
pub use medication::MedicationOrder;
pub use patient::Patient;
