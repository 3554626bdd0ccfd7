use shared::Message;

/// What a line typed on stdin asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(Message),
    Quit,
}

/// Turns one console line into a command.
///
/// `/move x y` requests a walk, `/quit` leaves, and any other non-empty line is
/// chat. Malformed `/move` arguments are reported back as an error string.
pub fn parse_line(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    match words.next() {
        Some("/quit") => Ok(Some(Command::Quit)),
        Some("/move") => {
            let coords: Vec<&str> = words.collect();
            let [x, y] = coords.as_slice() else {
                return Err("usage: /move <x> <y>".to_string());
            };
            let x = x.parse().map_err(|_| format!("bad x coordinate {x:?}"))?;
            let y = y.parse().map_err(|_| format!("bad y coordinate {y:?}"))?;
            Ok(Some(Command::Send(Message::CliMove { x, y })))
        }
        _ => Ok(Some(Command::Send(Message::CliChat {
            text: line.to_string(),
        }))),
    }
}
