//! Parses inbound ASCII control lines into typed commands.

use crate::error::AsciiParseError;

/// A parsed inbound ASCII control line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Command {
    /// `hello` - requests the controller (re)announce itself.
    Hello,
    /// `cc <pot_index> <cc_number>` - remaps a pot's outgoing CC number.
    SetCc { pot_index: u8, cc_number: u8 },
    /// `reset` - re-sends the MPE configuration and pitch-bend-range handshake.
    Reset,
    /// `ping` - liveness check, answered with `pong`.
    Ping,
    /// `v` - firmware version query, answered with `v <n>`.
    Version,
}

/// Parses one line, already stripped of its terminating `\n`/`\r`.
pub fn parse(line: &str) -> Result<Command, AsciiParseError> {
    let mut tokens = line.split_whitespace();
    let keyword = tokens.next().ok_or_else(|| AsciiParseError::new(line))?;

    match keyword {
        "hello" => Ok(Command::Hello),
        "reset" => Ok(Command::Reset),
        "ping" => Ok(Command::Ping),
        "v" => Ok(Command::Version),
        "cc" => {
            let pot_index = tokens
                .next()
                .and_then(|t| t.parse::<u8>().ok())
                .ok_or_else(|| AsciiParseError::new(line))?;
            let cc_number = tokens
                .next()
                .and_then(|t| t.parse::<u8>().ok())
                .ok_or_else(|| AsciiParseError::new(line))?;
            if cc_number > 127 || tokens.next().is_some() {
                return Err(AsciiParseError::new(line));
            }
            Ok(Command::SetCc {
                pot_index,
                cc_number,
            })
        }
        _ => Err(AsciiParseError::new(line)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_keywords() {
        assert_eq!(parse("hello"), Ok(Command::Hello));
        assert_eq!(parse("reset"), Ok(Command::Reset));
        assert_eq!(parse("ping"), Ok(Command::Ping));
        assert_eq!(parse("v"), Ok(Command::Version));
    }

    #[test]
    fn parses_cc_remap() {
        assert_eq!(
            parse("cc 3 74"),
            Ok(Command::SetCc {
                pot_index: 3,
                cc_number: 74
            })
        );
    }

    #[test]
    fn rejects_malformed_cc_and_unknown_keywords() {
        assert!(parse("cc 3").is_err());
        assert!(parse("cc 3 200").is_err());
        assert!(parse("cc 3 74 extra").is_err());
        assert!(parse("frobnicate").is_err());
        assert!(parse("").is_err());
    }
}
