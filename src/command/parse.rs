//! Command argument validation
//!
//! Turns a command name plus its raw positional arguments into a typed
//! [`Command`]. Nothing here touches the transport.

use cuddlebot_shared::{Command, LoopCount, PidCoefficients, Setpoint};
use thiserror::Error;
use tracing::debug;

/// Token accepted in place of a loop count to repeat indefinitely
pub const LOOP_FOREVER: &str = "forever";

/// Invalid command line input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UsageError {
    #[error("no actuator selected, pass one of -ribs, -purr, -spine, -headx, -heady")]
    NoActuator,

    #[error("only one actuator may be selected, got {0}")]
    MultipleActuators(String),

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("{command} expects {expected}, got {got} argument(s)")]
    Arity {
        command: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("duration and setpoint must be given in pairs")]
    UnpairedSetpoints,

    #[error("{field} must be a finite number, got '{value}'")]
    InvalidFloat { field: String, value: String },

    #[error("{field} must be an integer, got '{value}'")]
    InvalidInteger { field: String, value: String },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: String, value: String },

    #[error("{field} must be at most {max}, got {value}")]
    OutOfRange { field: String, max: u16, value: String },
}

/// Parse `name` and its arguments into a command
pub fn parse<S: AsRef<str>>(name: &str, args: &[S]) -> Result<Command, UsageError> {
    let args: Vec<&str> = args.iter().map(|s| s.as_ref()).collect();

    let command = match name {
        "setpid" => parse_setpid(&args)?,
        "setpoint" => parse_setpoint(&args)?,
        "ping" => no_args("ping", &args, Command::Ping)?,
        "test" => no_args("test", &args, Command::RunSelfTest)?,
        "value" => no_args("value", &args, Command::RequestPosition)?,
        other => return Err(UsageError::UnknownCommand(other.to_string())),
    };

    debug!("parsed {:?}", command);
    Ok(command)
}

fn parse_setpid(args: &[&str]) -> Result<Command, UsageError> {
    let [kp, ki, kd] = args else {
        return Err(UsageError::Arity {
            command: "setpid",
            expected: "3 arguments (kp ki kd)",
            got: args.len(),
        });
    };

    Ok(Command::SetPid(PidCoefficients {
        kp: parse_f32("kp", kp)?,
        ki: parse_f32("ki", ki)?,
        kd: parse_f32("kd", kd)?,
    }))
}

fn parse_setpoint(args: &[&str]) -> Result<Command, UsageError> {
    if args.len() < 4 {
        return Err(UsageError::Arity {
            command: "setpoint",
            expected: "delay, loop and at least one duration/setpoint pair",
            got: args.len(),
        });
    }
    if args.len() % 2 != 0 {
        return Err(UsageError::UnpairedSetpoints);
    }

    let delay = parse_u16("delay", args[0], u16::MAX)?;
    let loop_count = if args[1] == LOOP_FOREVER {
        LoopCount::Forever
    } else {
        LoopCount::Times(parse_u16("loop", args[1], LoopCount::MAX_TIMES)?)
    };

    let setpoints = args[2..]
        .chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| {
            Ok(Setpoint {
                duration: parse_u16(&format!("duration #{}", i + 1), pair[0], u16::MAX)?,
                setpoint: parse_u16(&format!("setpoint #{}", i + 1), pair[1], u16::MAX)?,
            })
        })
        .collect::<Result<Vec<_>, UsageError>>()?;

    Ok(Command::SetSetpoints {
        delay,
        loop_count,
        setpoints,
    })
}

fn no_args(command: &'static str, args: &[&str], value: Command) -> Result<Command, UsageError> {
    if !args.is_empty() {
        return Err(UsageError::Arity {
            command,
            expected: "no arguments",
            got: args.len(),
        });
    }
    Ok(value)
}

fn parse_f32(field: &str, token: &str) -> Result<f32, UsageError> {
    match token.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(UsageError::InvalidFloat {
            field: field.into(),
            value: token.into(),
        }),
    }
}

fn parse_u16(field: &str, token: &str, max: u16) -> Result<u16, UsageError> {
    let value: i64 = token.parse().map_err(|_| UsageError::InvalidInteger {
        field: field.into(),
        value: token.into(),
    })?;

    if value < 0 {
        return Err(UsageError::Negative {
            field: field.into(),
            value: token.into(),
        });
    }
    if value > i64::from(max) {
        return Err(UsageError::OutOfRange {
            field: field.into(),
            max,
            value: token.into(),
        });
    }

    Ok(value as u16)
}
