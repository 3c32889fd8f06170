use std::path::Path;
use std::process::Command;

/// Builds the batch-mode simulator invocation for one netlist.
pub trait SimulatorCommand {
    fn command(&self, netlist: &Path) -> Command;

    fn describe(&self) -> String;
}

impl<T> SimulatorCommand for &T
where
    T: SimulatorCommand + ?Sized,
{
    fn command(&self, netlist: &Path) -> Command {
        (**self).command(netlist)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
