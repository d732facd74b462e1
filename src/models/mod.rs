pub mod scan;

pub use scan::ScanRecord;
