//! Unit suite for the runtime component.
