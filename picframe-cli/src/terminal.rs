//! Terminal stand-ins for the panel and the touch controller
//!
//! `picframe run` drives the navigation state machine from text commands,
//! one per line, and prints what the panel would show:
//!
//! ```text
//! tap 512 20          # press and lift
//! hold 512 20         # press without lifting
//! release             # lift every finger
//! multi 100 100 600 300
//! quit
//! ```

use anyhow::{anyhow, bail, Context, Result};
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, warn};

use picframe_core::navigation::{
    Display, FolderLayout, GestureEvent, InputSender, NavLayout, Orientation, SourceLayout,
    TouchPoint,
};

/// Prints one line per drawing call
#[derive(Debug, Default)]
pub struct TerminalDisplay {
    orientation: Orientation,
}

impl Display for TerminalDisplay {
    fn show(&mut self, image: &Path) {
        println!("[show] {}", image.display());
    }

    fn clear(&mut self) {
        debug!("clear");
    }

    fn draw_chrome(&mut self, layout: &NavLayout) {
        debug!(
            "chrome: previous {:?} next {:?} rotate {:?} home {:?} exit {:?}",
            layout.previous, layout.next, layout.rotate, layout.home, layout.exit
        );
    }

    fn draw_source_menu(&mut self, layout: &SourceLayout) {
        println!("[menu] choose a source ({:?})", self.orientation);
        for (label, rect) in [
            ("local", layout.local),
            ("remote", layout.remote),
            ("network", layout.network),
        ] {
            let center = rect.center();
            println!("  {label:<8} tap {} {}", center.x, center.y);
        }
    }

    fn draw_folder_menu(&mut self, layout: &FolderLayout, folders: &[String]) {
        println!("[menu] choose a folder");
        for (idx, folder) in folders.iter().enumerate() {
            let center = layout.row(idx).center();
            println!("  {folder:<24} tap {} {}", center.x, center.y);
        }
    }

    fn show_filename(&mut self, name: &str) {
        println!("[file] {name}");
    }

    fn show_message(&mut self, message: &str) {
        println!("[message] {message}");
    }

    fn zoom(&mut self, scale: f32) {
        println!("[zoom] x{scale:.2}");
    }

    fn pan(&mut self, dx: i32, dy: i32) {
        println!("[pan] {dx} {dy}");
    }

    fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
        println!("[orientation] {orientation:?}");
    }
}

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptLine {
    Events(Vec<GestureEvent>),
    Quit,
}

/// Parse one command line. Blank lines and `#` comments yield no events.
pub fn parse_line(line: &str) -> Result<ScriptLine> {
    let line = line.split('#').next().unwrap_or_default().trim();
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(ScriptLine::Events(Vec::new()));
    };
    let args: Vec<u16> = words
        .map(|word| {
            word.parse::<u16>()
                .with_context(|| format!("Invalid coordinate '{word}'"))
        })
        .collect::<Result<_>>()?;

    let events = match (command, args.as_slice()) {
        ("tap", [x, y]) => vec![GestureEvent::single(*x, *y), GestureEvent::release()],
        ("hold", [x, y]) => vec![GestureEvent::single(*x, *y)],
        ("release", []) => vec![GestureEvent::release()],
        ("multi", coords) if coords.len() >= 4 && coords.len() % 2 == 0 => {
            let points = coords
                .chunks_exact(2)
                .map(|pair| TouchPoint::new(pair[0], pair[1]));
            vec![GestureEvent::multi(points)]
        }
        ("quit" | "exit", []) => return Ok(ScriptLine::Quit),
        ("tap" | "hold", _) => bail!("'{command}' takes X Y"),
        ("multi", _) => bail!("'multi' takes at least two X Y pairs"),
        _ => return Err(anyhow!("Unknown command '{command}'")),
    };

    Ok(ScriptLine::Events(events))
}

/// Input-capture loop: parse lines from `reader` into the queue until EOF,
/// `quit` or the navigation loop goes away. Runs on its own thread, like the
/// touch controller's capture task. Dropping `sender` on return closes the
/// queue.
pub fn feed_input<R: BufRead>(reader: R, sender: InputSender) -> Result<()> {
    for (idx, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        let events = match parse_line(&line) {
            Ok(ScriptLine::Events(events)) => events,
            Ok(ScriptLine::Quit) => break,
            Err(e) => {
                warn!("line {}: {:#}", idx + 1, e);
                continue;
            }
        };

        for event in events {
            if !sender.blocking_send(event) {
                return Ok(());
            }
        }
    }

    Ok(())
}
