//! Output functions writing to the execution's captured streams

use crate::executor::errors::ErrorInfo;
use crate::executor::types::Val;
use crate::executor::vm::VM;

fn join(args: &[Val]) -> String {
    let mut line = args
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    line.push('\n');
    line
}

/// print(...values) - space-joined line to captured stdout
pub fn print(vm: &mut VM, args: &[Val]) -> Result<Val, ErrorInfo> {
    vm.write_stdout(&join(args));
    Ok(Val::Null)
}

/// eprint(...values) - space-joined line to captured stderr
pub fn eprint(vm: &mut VM, args: &[Val]) -> Result<Val, ErrorInfo> {
    vm.write_stderr(&join(args));
    Ok(Val::Null)
}
