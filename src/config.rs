//! Command line parsing and the resolved run configuration

use crate::command::{self, UsageError};
use crate::transport::SerialConfig;
use clap::{Args, Parser};
use cuddlebot_shared::{link, Address, Command};
use std::ffi::OsString;

const COMMANDS_HELP: &str = "\
Commands:
  setpid <kp> <ki> <kd>
        Set the PID coefficients (floats)
  setpoint <delay> <loop> <duration> <setpoint> [<duration> <setpoint>]...
        Send a setpoint sequence. delay is in milliseconds, loop is a repeat
        count or \"forever\", duration is in milliseconds and setpoint is in
        1/65536ths of a turn
  ping
        Send a ping and print the reply
  test
        Run the actuator self test and print its report (up to 5 minutes)
  value
        Read the motor position

Examples:
  cuddlespeak -ribs setpid 40.4 1.0 -1.0
  cuddlespeak -ribs setpoint 0 forever 1000 26075 1000 0
  cuddlespeak -ribs ping
  cuddlespeak -ribs test
  cuddlespeak -ribs value";

/// Flags that are also accepted with a single leading dash
const LONG_FLAGS: [&str; 9] = [
    "ribs", "purr", "spine", "headx", "heady", "port", "baud", "debug", "help",
];

/// Flags that take a value in the following argument
const VALUE_FLAGS: [&str; 2] = ["port", "baud"];

/// Cuddlespeak is a tool for testing the Cuddlebot actuators.
#[derive(Parser, Debug)]
#[command(name = "cuddlespeak", version, after_help = COMMANDS_HELP)]
pub struct Cli {
    #[command(flatten)]
    pub actuator: ActuatorSelection,

    /// The serial port name
    #[arg(long, value_name = "PATH", default_value = link::DEFAULT_PORT)]
    pub port: String,

    /// Serial line speed
    #[arg(long, value_name = "RATE", default_value_t = link::DEFAULT_BAUD_RATE)]
    pub baud: u32,

    /// Print debug messages
    #[arg(long)]
    pub debug: bool,

    /// One of: setpid, setpoint, ping, test, value
    pub command: String,

    /// Command arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Actuator selector flags; exactly one must be set
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuatorSelection {
    /// Send command to ribs actuator
    #[arg(long)]
    pub ribs: bool,

    /// Send command to purr actuator
    #[arg(long)]
    pub purr: bool,

    /// Send command to spine actuator
    #[arg(long)]
    pub spine: bool,

    /// Send command to head yaw actuator
    #[arg(long)]
    pub headx: bool,

    /// Send command to head pitch actuator
    #[arg(long)]
    pub heady: bool,
}

impl ActuatorSelection {
    /// Resolve the selector flags to a single address
    pub fn resolve(&self) -> Result<Address, UsageError> {
        let flags = [self.ribs, self.purr, self.spine, self.headx, self.heady];
        let selected: Vec<Address> = Address::ALL
            .into_iter()
            .zip(flags)
            .filter_map(|(addr, on)| on.then_some(addr))
            .collect();

        match selected.as_slice() {
            [] => Err(UsageError::NoActuator),
            [addr] => Ok(*addr),
            many => Err(UsageError::MultipleActuators(
                many.iter()
                    .map(|addr| format!("-{}", flag_name(*addr)))
                    .collect::<Vec<_>>()
                    .join(", "),
            )),
        }
    }
}

fn flag_name(addr: Address) -> &'static str {
    match addr {
        Address::Ribs => "ribs",
        Address::Purr => "purr",
        Address::Spine => "spine",
        Address::HeadYaw => "headx",
        Address::HeadPitch => "heady",
    }
}

/// Everything a single invocation needs, validated
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub address: Address,
    pub serial: SerialConfig,
    pub debug: bool,
    pub command: Command,
}

impl Cli {
    /// Validate the parsed flags and arguments
    pub fn into_config(self) -> Result<Config, UsageError> {
        let address = self.actuator.resolve()?;
        let command = command::parse(&self.command, &self.args)?;

        Ok(Config {
            address,
            serial: SerialConfig {
                port: self.port,
                baud_rate: self.baud,
            },
            debug: self.debug,
            command,
        })
    }
}

/// Rewrite single-dash long flags (`-ribs`, `-port /dev/x`) to the
/// double-dash form clap expects.
///
/// Rewriting stops at the first positional argument, so negative numbers
/// and anything else after the command name pass through untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut iter = args.into_iter().map(Into::into);
    let mut out: Vec<OsString> = iter.next().into_iter().collect();

    while let Some(arg) = iter.next() {
        let Some(text) = arg.to_str() else {
            out.push(arg);
            continue;
        };

        if text == "--" || !text.starts_with('-') {
            out.push(arg);
            break;
        }

        let (name, inline_value) = match text.trim_start_matches('-').split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (text.trim_start_matches('-'), None),
        };

        if !LONG_FLAGS.contains(&name) {
            out.push(arg);
            continue;
        }

        out.push(OsString::from(format!("--{}", text.trim_start_matches('-'))));
        if inline_value.is_none() && VALUE_FLAGS.contains(&name) {
            if let Some(value) = iter.next() {
                out.push(value);
            }
        }
    }

    out.extend(iter);
    out
}
