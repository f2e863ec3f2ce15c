//! Business logic services (use cases).
//!
//! Services apply input rules and orchestrate repository calls. They depend
//! on traits (ports) -- never on concrete infrastructure implementations.

pub mod keyword;
