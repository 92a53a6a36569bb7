//! SUBLEERUNKER command line
//!
//! Headless tools around the deterministic core: solve for a goal score,
//! score or decode a replay, and play a demo game with a random-walk input.

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::env;
    use std::io::{self, Write};

    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;
    use serde_json::json;

    use subleerunker::consts::TIME_STEP_MS;
    use subleerunker::game::{GameEvent, Subleerunker};
    use subleerunker::settings::Strategy;
    use subleerunker::sim::NullSink;
    use subleerunker::solver::{self, Goal, GoalType, Progress, Solver, Start};
    use subleerunker::{Replay, Settings};

    const DEFAULT_MAX_TRIES: u32 = 100;
    const DEFAULT_PLAY_FRAMES: u64 = 60 * 60 * 10;

    enum Command {
        Solve {
            start: String,
            goal: Goal,
            max_tries: u32,
            strategy: Option<Strategy>,
        },
        Score {
            replay: String,
        },
        Decode {
            replay: String,
        },
        Play {
            frames: u64,
        },
    }

    pub fn run_cli() -> Result<(), String> {
        let args = env::args().skip(1).collect::<Vec<_>>();
        if args.is_empty() {
            return Err(usage_text());
        }
        if args[0] == "-h" || args[0] == "--help" {
            println!("{}", usage_text());
            return Ok(());
        }

        let mut settings = Settings::default();
        let mut index = 0usize;
        while index < args.len() {
            match args[index].as_str() {
                "--settings" => {
                    let path = option_value(&args, index, "--settings")?;
                    settings = Settings::load(path).map_err(|err| err.to_string())?;
                    index += 2;
                }
                "--seed" => {
                    let value = option_value(&args, index, "--seed")?;
                    settings.random_seed = Some(parse_number(value, "--seed")?);
                    index += 2;
                }
                _ => break,
            }
        }

        let command = args
            .get(index)
            .ok_or_else(|| "missing subcommand".to_string())?
            .as_str();
        let command = parse_command(command, &args[(index + 1)..], &mut settings)?;
        execute(command, &mut settings)
    }

    fn option_value<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str, String> {
        args.get(index + 1)
            .map(String::as_str)
            .ok_or_else(|| format!("missing value for {name}"))
    }

    fn parse_number<T: std::str::FromStr>(value: &str, name: &str) -> Result<T, String> {
        value
            .parse::<T>()
            .map_err(|_| format!("invalid {name} value '{value}'"))
    }

    fn parse_command(command: &str, args: &[String], settings: &mut Settings) -> Result<Command, String> {
        match command {
            "solve" => {
                let mut positional = Vec::new();
                let mut strategy = None;
                let mut index = 0usize;
                while index < args.len() {
                    match args[index].as_str() {
                        "--strategy" => {
                            let value = option_value(args, index, "--strategy")?;
                            strategy = Some(Strategy::from_str(value).ok_or_else(|| {
                                format!("unknown strategy '{value}' (expected growth or genetic)")
                            })?);
                            index += 2;
                        }
                        arg => {
                            positional.push(arg.to_string());
                            index += 1;
                        }
                    }
                }
                let mut positional = positional.into_iter();
                let start = positional
                    .next()
                    .ok_or_else(|| "solve requires a random seed or an encoded replay".to_string())?;
                let score = positional
                    .next()
                    .map(|value| parse_number(&value, "goal"))
                    .transpose()?
                    .unwrap_or(0);
                let kind = positional
                    .next()
                    .map(|value| value.parse::<GoalType>().map_err(|err| err.to_string()))
                    .transpose()?
                    .unwrap_or_default();
                let max_tries = positional
                    .next()
                    .map(|value| parse_number(&value, "max tries"))
                    .transpose()?
                    .unwrap_or(DEFAULT_MAX_TRIES);
                if let Some(extra) = positional.next() {
                    return Err(format!("unexpected solve argument '{extra}'"));
                }
                Ok(Command::Solve {
                    start,
                    goal: Goal { score, kind },
                    max_tries,
                    strategy,
                })
            }
            "score" | "decode" => {
                let [replay] = args else {
                    return Err(format!("{command} requires exactly one encoded replay"));
                };
                let replay = replay.clone();
                Ok(if command == "score" {
                    Command::Score { replay }
                } else {
                    Command::Decode { replay }
                })
            }
            "play" => {
                let mut frames = DEFAULT_PLAY_FRAMES;
                let mut index = 0usize;
                while index < args.len() {
                    match args[index].as_str() {
                        "--seed" => {
                            let value = option_value(args, index, "--seed")?;
                            settings.random_seed = Some(parse_number(value, "--seed")?);
                        }
                        "--frames" => {
                            let value = option_value(args, index, "--frames")?;
                            frames = parse_number(value, "--frames")?;
                        }
                        other => return Err(format!("unknown play argument '{other}'")),
                    }
                    index += 2;
                }
                Ok(Command::Play { frames })
            }
            other => Err(format!("unknown subcommand '{other}'")),
        }
    }

    fn execute(command: Command, settings: &mut Settings) -> Result<(), String> {
        let mut out = io::stdout().lock();
        match command {
            Command::Solve {
                start,
                goal,
                max_tries,
                strategy,
            } => {
                if let Some(strategy) = strategy {
                    settings.solver.strategy = strategy;
                }
                let solver = Solver::parse(&start, goal, max_tries, settings).map_err(|err| err.to_string())?;
                for progress in solver {
                    let progress = progress.map_err(|err| err.to_string())?;
                    let line = serde_json::to_string(progress.report()).map_err(|err| err.to_string())?;
                    writeln!(out, "{line}").map_err(|err| err.to_string())?;
                    if let Progress::Finished(report) = &progress {
                        let outcome = if goal.reached(report.achieved_score) {
                            "reached"
                        } else {
                            "not reached"
                        };
                        log::info!("Goal {outcome}: {}", report.encoded_replay);
                    }
                }
            }
            Command::Score { replay } => {
                let replay = Replay::decode(&replay).map_err(|err| err.to_string())?;
                let evaluation = solver::determine_score(&replay, settings).map_err(|err| err.to_string())?;
                let line = serde_json::to_string(&evaluation).map_err(|err| err.to_string())?;
                writeln!(out, "{line}").map_err(|err| err.to_string())?;
            }
            Command::Decode { replay } => {
                let replay = Replay::decode(&replay).map_err(|err| err.to_string())?;
                let decoded = json!({
                    "randomSeed": replay.random_seed,
                    "records": replay.records(),
                    "encoded": replay.encode(),
                });
                let text = serde_json::to_string_pretty(&decoded).map_err(|err| err.to_string())?;
                writeln!(out, "{text}").map_err(|err| err.to_string())?;
            }
            Command::Play { frames } => {
                let (score, replay) = play(settings, frames).map_err(|err| err.to_string())?;
                let evaluation = solver::determine_score(&replay, settings).map_err(|err| err.to_string())?;
                let summary = json!({
                    "score": score,
                    "replay": replay.encode(),
                    "rescored": evaluation.score,
                    "deterministic": evaluation.score == score,
                });
                writeln!(out, "{summary}").map_err(|err| err.to_string())?;
            }
        }
        Ok(())
    }

    /// Play one game one step per tick, steering with a random walk
    fn play(settings: &Settings, frames: u64) -> Result<(u64, Replay), subleerunker::DesyncError> {
        let seed = settings.random_seed.unwrap_or_else(subleerunker::platform::random_seed);
        let settings = Settings {
            random_seed: Some(seed),
            ..settings.clone()
        };
        let mut walker = Pcg32::seed_from_u64(seed);
        let mut game = Subleerunker::new(settings).into_game();

        game.tick(0.0, &mut NullSink)?;
        game.tick(0.0, &mut NullSink)?;
        // Half a step ahead so every tick runs exactly one step
        let mut now = TIME_STEP_MS / 2.0;
        game.hooks.key_right(true);

        for _ in 0..frames {
            now += TIME_STEP_MS;
            game.tick(now, &mut NullSink)?;
            for event in game.hooks.drain_events() {
                if let GameEvent::GameOver { score, replay, .. } = event {
                    return Ok((score, replay));
                }
            }
            if walker.random_bool(0.05) {
                match walker.random_range(0..3) {
                    0 => {
                        game.hooks.key_left(false);
                        game.hooks.key_right(false);
                    }
                    1 => game.hooks.key_left(true),
                    _ => game.hooks.key_right(true),
                }
            }
        }

        log::warn!("Demo stopped after {frames} frames with the runner alive");
        let score = game.hooks.records().current;
        let replay = game.hooks.replay().map(Replay::snapshot).unwrap_or_else(|| Replay::new(seed));
        Ok((score, replay))
    }

    fn usage_text() -> String {
        [
            "usage: subleerunker [--settings FILE] [--seed N] <command>",
            "",
            "commands:",
            "  solve <seed|replay> [goal] [gte|eq] [max_tries] [--strategy growth|genetic]",
            "  score <replay>",
            "  decode <replay>",
            "  play [--seed N] [--frames N]",
        ]
        .join("\n")
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    env_logger::init();
    match cli::run_cli() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            std::process::ExitCode::from(1)
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The wasm entry points live in the library (`subleerunker::wasm`)
}
