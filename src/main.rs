use std::error::Error;
use std::net::SocketAddr;
use tablut::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut serve = false;
    let mut addr: SocketAddr = "127.0.0.1:3000".parse()?;
    let mut config = MatchConfig::default();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--web" => serve = true,
            "--addr" => addr = args.next().ok_or("--addr needs HOST:PORT")?.parse()?,
            "--limit" => config.move_limit = Some(args.next().ok_or("--limit needs a number")?.parse()?),
            other => return Err(format!("unknown argument: {}", other).into()),
        }
    }

    if serve {
        return tokio::runtime::Runtime::new()?.block_on(run_server(addr));
    }

    println!("Tablut - engine vs engine");
    println!("=========================\n");

    let black = Box::new(AiPlayer::new("Engine (Black)", Side::Black));
    let white = Box::new(AiPlayer::new("Engine (White)", Side::White));

    let mut game = Match::new(black, white, config)?;
    let result = game.play();

    println!("{}", game.board());
    println!("Moves: {}", game.transcript_text().join(" "));
    println!("\n=========================");
    match result {
        MatchResult::BlackWins { winner_name, moves } => {
            println!("  {} wins as Black in {} moves!", winner_name, moves);
        }
        MatchResult::WhiteWins { winner_name, moves } => {
            println!("  {} wins as White in {} moves!", winner_name, moves);
        }
        MatchResult::MoveLimit { winner_name, moves } => {
            println!("  {} wins on the move limit after {} moves", winner_name, moves);
        }
        MatchResult::NoMove { violator, winner } => {
            println!("  {} wins, {} had no move", winner, violator);
        }
        MatchResult::IllegalMove { violator, winner, mv } => {
            println!("  {} wins by illegal move {} (opponent: {})", winner, mv, violator);
        }
    }
    println!("=========================");
    Ok(())
}
