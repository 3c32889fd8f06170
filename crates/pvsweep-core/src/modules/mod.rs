pub mod dispatch;
pub mod geometry;
pub mod harvest;
pub mod layout;
pub mod netlist;
pub mod pipeline;
pub mod serialization;
pub mod waveform;

mod traits;

pub use traits::SimulatorCommand;
