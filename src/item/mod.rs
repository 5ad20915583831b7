/// This module provides a CSV table reader and writer.
pub mod csv;

/// This module provides the processor folding metadata entries into records.
pub mod flatten;

/// This module provides the XML document loader and record reader.
pub mod xml;
