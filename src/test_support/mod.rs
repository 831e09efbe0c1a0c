//! Shared helpers for unit tests.

pub mod socket_guard;

/// Smallest byte sequence the PDF validator accepts.
pub const MINIMAL_PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF\n";
