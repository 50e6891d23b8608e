use std::io::{self, BufRead, Write};

use chess::Color;

use memomax::{Engine, EngineError, Position};

fn main() -> io::Result<()> {
    env_logger::init();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    // The human takes White; the engine answers as Black.
    let mut engine = Engine::new(Position::default(), Color::Black);
    println!("{}\n", engine.position());

    while engine.position().outcome().is_none() {
        if engine.position().turn() == engine.color() {
            match engine.choose_move() {
                Ok(uci) => println!("engine plays {uci}\n{}\n", engine.position()),
                Err(EngineError::NoLegalMove) => break,
                Err(e) => {
                    println!("{e}");
                    break;
                }
            }
        } else {
            print!("Enter move in UCI notation: ");
            stdout.flush()?;
            let line = match lines.next() {
                Some(line) => line?,
                None => return Ok(()),
            };
            match engine.apply_opponent_move(&line) {
                Ok(()) => println!("{}\n", engine.position()),
                Err(e) => println!("{e}"),
            }
        }
    }

    match engine.position().outcome().and_then(|o| o.winner()) {
        Some(Color::White) => println!("White Wins!"),
        Some(Color::Black) => println!("Black Wins!"),
        None => println!("Draw"),
    }
    Ok(())
}
