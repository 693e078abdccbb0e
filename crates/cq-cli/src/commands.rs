use std::io::{self, BufRead, Write};

use anyhow::{bail, Context};
use colored::Colorize;
use cq_sdk::{
    AppConfig, CineQuiz, Cinema, Friend, GeoPoint, Nearby, QuizSession, RedemptionRecord, UserId,
    UserProfile, UserState,
};
use serde_json::json;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let out = cli.format;
    let open = || CineQuiz::from_config(config.clone());
    match cli.command {
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Command::Signin(args) => cmd_signin(&open()?, args, out).await,
        Command::Balance(args) => cmd_balance(&open()?, args, out).await,
        Command::Credit(args) => {
            let state = open()?.ledger().credit(&parse_user(&args.user)?, args.amount).await?;
            print_state(&state, out, &format!("Credited {} points", args.amount))
        }
        Command::Debit(args) => {
            let state = open()?.ledger().debit(&parse_user(&args.user)?, args.amount).await?;
            print_state(&state, out, &format!("Debited {} points", args.amount))
        }
        Command::Prizes(args) => cmd_prizes(&open()?, args, out).await,
        Command::Redeem(args) => {
            let state = open()?.redeem(&parse_user(&args.user)?, &args.prize).await?;
            print_state(&state, out, &format!("Redeemed {}", args.prize))
        }
        Command::History(args) => cmd_history(&open()?, args, out).await,
        Command::Friends(args) => cmd_friends(&open()?, args, out).await,
        Command::Quiz(args) => cmd_quiz(&open()?, args, out).await,
        Command::Nearest(args) => cmd_nearest(&open()?, args, out).await,
        Command::Bucket(args) => cmd_bucket(&open()?, args, out).await,
        Command::Seed(args) => cmd_seed(&open()?, args, out).await,
    }
}

fn parse_user(raw: &str) -> anyhow::Result<UserId> {
    UserId::new(raw).with_context(|| format!("invalid user id {raw:?}"))
}

fn print_state(state: &UserState, out: OutputFormat, headline: &str) -> anyhow::Result<()> {
    match out {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(state)?),
        OutputFormat::Text => {
            println!("{} {}", "✓".green().bold(), headline);
            println!("  User: {}", state.user_id().to_string().cyan());
            println!("  Points: {}", state.points().to_string().bold());
        }
    }
    Ok(())
}

async fn cmd_signin(app: &CineQuiz, args: SigninArgs, out: OutputFormat) -> anyhow::Result<()> {
    let mut profile = UserProfile::new(parse_user(&args.user)?);
    if let Some(name) = args.name {
        profile = profile.with_name(name);
    }
    if let Some(email) = args.email {
        profile = profile.with_email(email);
    }
    if let Some(url) = args.photo_url {
        profile = profile.with_photo_url(url);
    }
    let state = app.sign_in(&profile).await?;
    print_state(&state, out, "Signed in")
}

async fn cmd_balance(app: &CineQuiz, args: UserArgs, out: OutputFormat) -> anyhow::Result<()> {
    let state = app.profile(&parse_user(&args.user)?).await?;
    match out {
        OutputFormat::Json => println!("{}", json!({ "id": state.user_id(), "points": state.points() })),
        OutputFormat::Text => println!("{} points", state.points().to_string().bold()),
    }
    Ok(())
}

async fn cmd_prizes(app: &CineQuiz, args: PrizesArgs, out: OutputFormat) -> anyhow::Result<()> {
    let balance = match &args.user {
        Some(user) => Some(app.profile(&parse_user(user)?).await?.points()),
        None => None,
    };
    let prizes: Vec<_> = match balance {
        Some(points) => app.prizes().affordable(points),
        None => app.prizes().iter().collect(),
    };
    match out {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&prizes)?),
        OutputFormat::Text => {
            if prizes.is_empty() {
                println!("No prizes available.");
            }
            for prize in prizes {
                println!(
                    "{:>6}  {}  {}",
                    prize.points_required().to_string().yellow(),
                    prize.id.bold(),
                    prize.name
                );
                if !prize.description.is_empty() {
                    println!("        {}", prize.description.dimmed());
                }
            }
        }
    }
    Ok(())
}

async fn cmd_history(app: &CineQuiz, args: UserArgs, out: OutputFormat) -> anyhow::Result<()> {
    let history = app.history(&parse_user(&args.user)?).await?;
    match out {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&history)?),
        OutputFormat::Text => print_history(&history),
    }
    Ok(())
}

fn print_history(history: &[RedemptionRecord]) {
    if history.is_empty() {
        println!("No redemptions yet.");
        return;
    }
    for record in history {
        println!(
            "{}  {}  {}",
            record.redeemed_at.dimmed(),
            record.name.bold(),
            format!("-{}", record.points_required).red()
        );
    }
}

async fn cmd_friends(app: &CineQuiz, args: UserArgs, out: OutputFormat) -> anyhow::Result<()> {
    let friends = app.friends(&parse_user(&args.user)?).await;
    match out {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&friends)?),
        OutputFormat::Text => print_friends(&friends),
    }
    Ok(())
}

fn print_friends(friends: &[Friend]) {
    if friends.is_empty() {
        println!("No friends yet.");
    }
    for friend in friends {
        println!(
            "{:>6}  {}",
            friend.points.to_string().yellow(),
            friend.name.bold()
        );
    }
}

async fn cmd_quiz(app: &CineQuiz, args: QuizArgs, out: OutputFormat) -> anyhow::Result<()> {
    let user = parse_user(&args.user)?;
    let mut session = app.start_quiz().await;
    if session.questions().is_empty() {
        bail!("no questions available");
    }
    let mut scripted = args.answers.into_iter();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while let Some((index, question)) = session.current() {
        let question = question.clone();
        if out == OutputFormat::Text {
            println!("\n{} {}", format!("Q{}.", index + 1).yellow().bold(), question.text);
            for (i, option) in question.options.iter().enumerate() {
                println!("  {}. {}", i + 1, option);
            }
        }
        let choice = match scripted.next() {
            Some(n) => n,
            None => prompt_choice(&mut lines)?,
        };
        let Some(choice) = choice.checked_sub(1) else {
            bail!("answers are numbered from 1");
        };
        let correct = session.answer(index, choice)?;
        if out == OutputFormat::Text {
            if correct {
                println!("  {}", "Correct!".green().bold());
            } else {
                println!(
                    "  {} The answer was: {}",
                    "Wrong.".red().bold(),
                    question.correct_option().unwrap_or_default()
                );
            }
        }
    }

    let state = app.finish_quiz(&user, &mut session).await?;
    report_quiz(&session, &state, out)
}

fn prompt_choice(lines: &mut impl Iterator<Item = io::Result<String>>) -> anyhow::Result<usize> {
    loop {
        print!("Your answer (1-4): ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            bail!("input closed before the quiz was finished");
        };
        match line?.trim().parse::<usize>() {
            Ok(n) if (1..=4).contains(&n) => return Ok(n),
            _ => println!("Please enter a number from 1 to 4."),
        }
    }
}

fn report_quiz(session: &QuizSession, state: &UserState, out: OutputFormat) -> anyhow::Result<()> {
    match out {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "score": session.score(),
                "questions": session.questions().len(),
                "pointsEarned": session.points_earned(),
                "points": state.points(),
            })
        ),
        OutputFormat::Text => {
            println!(
                "\n{} {}/{} correct, {} points earned",
                "✓".green().bold(),
                session.score(),
                session.questions().len(),
                session.points_earned().to_string().bold()
            );
            println!("  Balance: {}", state.points().to_string().bold());
        }
    }
    Ok(())
}

async fn cmd_nearest(app: &CineQuiz, args: NearestArgs, out: OutputFormat) -> anyhow::Result<()> {
    let origin = GeoPoint::new(args.lat, args.lon)?;
    let nearby = app.nearest_cinemas(origin, args.count).await;
    match out {
        OutputFormat::Json => {
            let rows: Vec<_> = nearby
                .iter()
                .map(|n| json!({ "cinema": n.item, "distanceKm": n.distance_km }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Text => print_nearby(&nearby),
    }
    Ok(())
}

fn print_nearby(nearby: &[Nearby<Cinema>]) {
    if nearby.is_empty() {
        println!("No cinemas found.");
    }
    for n in nearby {
        println!(
            "{:>7}  {}",
            format!("{:.2} km", n.distance_km).cyan(),
            n.item.name.bold()
        );
        if !n.item.address.is_empty() {
            println!("         {}", n.item.address.dimmed());
        }
    }
}

async fn cmd_bucket(app: &CineQuiz, args: BucketArgs, out: OutputFormat) -> anyhow::Result<()> {
    match args.action {
        BucketAction::Verify => {
            let reports = app.verify_buckets().await?;
            let healthy = reports.iter().all(|r| r.status.is_found());
            match out {
                OutputFormat::Json => {
                    let rows: Vec<_> = reports
                        .iter()
                        .map(|r| json!({ "bucket": r.bucket, "found": r.status.is_found(), "status": r.status.to_string() }))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                }
                OutputFormat::Text => {
                    for r in &reports {
                        let mark = if r.status.is_found() { "✓".green().bold() } else { "✗".red().bold() };
                        println!("{} {}: {}", mark, r.bucket.bold(), r.status);
                    }
                }
            }
            if !healthy {
                bail!("bucket check failed");
            }
        }
        BucketAction::Ensure => {
            let results = app.ensure_buckets().await?;
            for (bucket, ok) in &results {
                match out {
                    OutputFormat::Json => println!("{}", json!({ "bucket": bucket, "exists": ok })),
                    OutputFormat::Text if *ok => println!("{} {}", "✓".green().bold(), bucket.bold()),
                    OutputFormat::Text => println!("{} {} could not be created", "✗".red().bold(), bucket.bold()),
                }
            }
            if results.iter().any(|(_, ok)| !ok) {
                bail!("some buckets are missing");
            }
        }
    }
    Ok(())
}

async fn cmd_seed(app: &CineQuiz, args: SeedArgs, out: OutputFormat) -> anyhow::Result<()> {
    let (what, count) = match args.what {
        SeedTarget::Questions { force } => ("questions", app.seed_questions(force).await?),
        SeedTarget::Cinemas { listing } => {
            let text = match &listing {
                Some(path) => Some(
                    std::fs::read_to_string(path)
                        .with_context(|| format!("cannot read {}", path.display()))?,
                ),
                None => None,
            };
            ("cinemas", Some(app.seed_cinemas(text.as_deref()).await?))
        }
    };
    match (out, count) {
        (OutputFormat::Json, _) => println!("{}", json!({ "seeded": what, "count": count })),
        (OutputFormat::Text, Some(n)) => println!("{} Uploaded {} {}", "✓".green().bold(), n, what),
        (OutputFormat::Text, None) => {
            println!("{} already present, use --force to overwrite", what.yellow())
        }
    }
    Ok(())
}
