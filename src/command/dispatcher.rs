//! Command dispatcher - encodes a command and applies its response policy

use crate::transport::{Session, TransportStream};
use anyhow::{Context, Result};
use cuddlebot_shared::{codec, Address, Command};
use tokio::io::AsyncWrite;
use tokio::time::Duration;
use tracing::debug;

/// Reply window for ping and position requests
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(1);

/// Reply window for the self test, which streams its report as it runs
pub const SELF_TEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Whether, and for how long, to read a reply after sending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePolicy {
    /// Fire and forget
    None,
    /// Copy reply bytes to the output until the window closes
    Await(Duration),
}

/// Response policy for a command. Fixed per variant.
pub fn response_policy(command: &Command) -> ResponsePolicy {
    match command {
        Command::SetPid(_) | Command::SetSetpoints { .. } => ResponsePolicy::None,
        Command::Ping | Command::RequestPosition => ResponsePolicy::Await(REPLY_TIMEOUT),
        Command::RunSelfTest => ResponsePolicy::Await(SELF_TEST_TIMEOUT),
    }
}

/// Result of a completed dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Frame size written to the transport
    pub sent: usize,
    /// Reply bytes forwarded, if a reply was awaited
    pub reply_bytes: Option<usize>,
}

/// Encode `command` for `address`, send it, and forward any reply to `sink`
pub async fn dispatch<S, W>(
    session: &mut Session<S>,
    address: Address,
    command: &Command,
    sink: &mut W,
) -> Result<DispatchOutcome>
where
    S: TransportStream,
    W: AsyncWrite + Unpin + ?Sized,
{
    let frame = codec::encode(address, command)
        .with_context(|| format!("failed to encode {} command", command.name()))?;

    let reply_bytes = match response_policy(command) {
        ResponsePolicy::None => {
            session.send(&frame).await?;
            None
        }
        ResponsePolicy::Await(timeout) => {
            Some(session.send_and_await(&frame, timeout, sink).await?)
        }
    };

    debug!("sent {} message to address {}", command.name(), address);

    Ok(DispatchOutcome {
        sent: frame.len(),
        reply_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use cuddlebot_shared::{LoopCount, PidCoefficients, Setpoint};
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::time::Instant;

    /// Read one frame off the wire, as the controller would
    async fn read_frame(remote: &mut DuplexStream) -> (Address, Command) {
        let mut buf = BytesMut::new();
        loop {
            if let Some(frame) = codec::decode(&mut buf).expect("bad frame") {
                return frame;
            }
            let mut chunk = [0u8; 64];
            let n = remote.read(&mut chunk).await.expect("read failed");
            assert!(n > 0, "stream closed before a full frame arrived");
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    #[test]
    fn test_response_policy_per_variant() {
        let pid = Command::SetPid(PidCoefficients {
            kp: 1.0,
            ki: 0.0,
            kd: 0.0,
        });
        let setpoints = Command::SetSetpoints {
            delay: 0,
            loop_count: LoopCount::Times(1),
            setpoints: vec![Setpoint {
                duration: 10,
                setpoint: 10,
            }],
        };

        assert_eq!(response_policy(&pid), ResponsePolicy::None);
        assert_eq!(response_policy(&setpoints), ResponsePolicy::None);
        assert_eq!(
            response_policy(&Command::Ping),
            ResponsePolicy::Await(Duration::from_secs(1))
        );
        assert_eq!(
            response_policy(&Command::RequestPosition),
            ResponsePolicy::Await(Duration::from_secs(1))
        );
        assert_eq!(
            response_policy(&Command::RunSelfTest),
            ResponsePolicy::Await(Duration::from_secs(300))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_setpid_is_fire_and_forget() {
        let (local, mut remote) = duplex(256);
        let mut session = Session::new(local);
        let cmd = Command::SetPid(PidCoefficients {
            kp: 40.4,
            ki: 1.0,
            kd: -1.0,
        });

        let started = Instant::now();
        let mut out = Vec::new();
        let outcome = dispatch(&mut session, Address::Ribs, &cmd, &mut out)
            .await
            .expect("dispatch failed");

        assert_eq!(outcome.reply_bytes, None);
        assert!(out.is_empty());
        assert!(started.elapsed() < REPLY_TIMEOUT);
        assert_eq!(read_frame(&mut remote).await, (Address::Ribs, cmd));
    }

    #[tokio::test(start_paused = true)]
    async fn test_setpoints_reach_the_wire() {
        let (local, mut remote) = duplex(256);
        let mut session = Session::new(local);
        let cmd = Command::SetSetpoints {
            delay: 0,
            loop_count: LoopCount::Forever,
            setpoints: vec![
                Setpoint {
                    duration: 1000,
                    setpoint: 26075,
                },
                Setpoint {
                    duration: 1000,
                    setpoint: 0,
                },
            ],
        };

        let mut out = Vec::new();
        let outcome = dispatch(&mut session, Address::Spine, &cmd, &mut out)
            .await
            .expect("dispatch failed");

        assert_eq!(outcome.reply_bytes, None);
        assert_eq!(outcome.sent, codec::HEADER_LEN + 6 + 8 + codec::CRC_LEN);
        assert_eq!(read_frame(&mut remote).await, (Address::Spine, cmd));
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_reply_is_forwarded() {
        let (local, mut remote) = duplex(256);
        let mut session = Session::new(local);

        let controller = tokio::spawn(async move {
            let frame = read_frame(&mut remote).await;
            remote.write_all(b"0.1\n").await.expect("reply failed");
            frame
        });

        let mut out = Vec::new();
        let outcome = dispatch(&mut session, Address::HeadYaw, &Command::RequestPosition, &mut out)
            .await
            .expect("dispatch failed");

        assert_eq!(
            controller.await.expect("controller panicked"),
            (Address::HeadYaw, Command::RequestPosition)
        );
        assert_eq!(outcome.reply_bytes, Some(4));
        assert_eq!(out, b"0.1\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_ping_completes_after_one_second() {
        let (local, _remote) = duplex(256);
        let mut session = Session::new(local);

        let started = Instant::now();
        let mut out = Vec::new();
        let outcome = dispatch(&mut session, Address::Purr, &Command::Ping, &mut out)
            .await
            .expect("no reply is not an error");

        assert_eq!(outcome.reply_bytes, Some(0));
        assert!(out.is_empty());
        let waited = started.elapsed();
        assert!(waited >= REPLY_TIMEOUT && waited < SELF_TEST_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_self_test_waits_five_minutes() {
        let (local, mut remote) = duplex(256);
        let mut session = Session::new(local);

        let controller = tokio::spawn(async move {
            read_frame(&mut remote).await;
            remote.write_all(b"motor ok\n").await.expect("reply failed");
            tokio::time::sleep(Duration::from_secs(120)).await;
            remote.write_all(b"encoder ok\n").await.expect("reply failed");
            remote
        });

        let started = Instant::now();
        let mut out = Vec::new();
        let outcome = dispatch(&mut session, Address::HeadPitch, &Command::RunSelfTest, &mut out)
            .await
            .expect("dispatch failed");

        assert!(started.elapsed() >= SELF_TEST_TIMEOUT);
        assert_eq!(out, b"motor ok\nencoder ok\n");
        assert_eq!(outcome.reply_bytes, Some(out.len()));
        drop(controller.await.expect("controller panicked"));
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let (local, remote) = duplex(256);
        drop(remote);
        let mut session = Session::new(local);

        let mut out = Vec::new();
        let err = dispatch(&mut session, Address::Ribs, &Command::Ping, &mut out)
            .await
            .expect_err("dispatch should fail");
        assert!(err.to_string().contains("Write to transport failed"));
    }
}
