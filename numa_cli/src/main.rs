use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use numa_core::wizard::TOTAL_STEPS;
use numa_core::*;
use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Parser)]
#[command(name = "numa")]
#[command(about = "NUMA care onboarding wizard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the onboarding wizard (default)
    Onboard {
        /// Ignore any saved draft and start over
        #[arg(long)]
        fresh: bool,

        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// List the clinician roster
    Roster,

    /// Show which clinician matches a set of preferences
    Match {
        /// weekdays, weekends or flexible
        #[arg(long, default_value = "flexible")]
        day: DayPreference,

        /// morning, evening or flexible
        #[arg(long, default_value = "flexible")]
        time: TimePreference,

        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: Option<String>,

        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// List bookable first-session slots for a clinician
    Slots {
        /// Clinician id (see `numa roster`)
        #[arg(long)]
        clinician: String,

        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Inspect or discard the saved draft
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },
}

#[derive(Subcommand)]
enum DraftAction {
    /// Print the saved draft as JSON
    Show,
    /// Delete the saved draft
    Clear,
}

const GENDERS: [&str; 4] = ["Female", "Male", "Non-binary", "Prefer not to say"];

fn main() -> Result<()> {
    // Warnings only by default so log lines don't crowd the prompts
    numa_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let store = DraftStore::new(data_dir.join(&config.data.draft_file));

    let extended;
    let reference = if config.roster.custom.is_empty() {
        get_default_reference()
    } else {
        extended = build_default_reference().with_custom_clinicians(&config.roster.custom);
        &extended
    };
    let errors = reference.validate();
    if !errors.is_empty() {
        eprintln!("Reference data validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid reference data".into()));
    }

    match cli.command {
        Some(Commands::Onboard { fresh, today }) => {
            let today = today.unwrap_or_else(local_today);
            cmd_onboard(&config, &store, reference.clone(), fresh, today)
        }
        Some(Commands::Roster) => cmd_roster(reference),
        Some(Commands::Match {
            day,
            time,
            dob,
            today,
        }) => cmd_match(
            reference,
            day,
            time,
            dob,
            today.unwrap_or_else(local_today),
        ),
        Some(Commands::Slots { clinician, today }) => {
            cmd_slots(reference, &clinician, today.unwrap_or_else(local_today))
        }
        Some(Commands::Draft { action }) => cmd_draft(&store, action),
        None => {
            // Default to "onboard" command
            cmd_onboard(&config, &store, reference.clone(), false, local_today())
        }
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

// ============================================================================
// Onboarding
// ============================================================================

/// Remembers where the wizard wants to send the user
struct TerminalExit {
    target: Rc<RefCell<Option<String>>>,
}

impl ExitHandler for TerminalExit {
    fn exit(&mut self, destination: &str, reason: ExitReason) {
        tracing::info!("Onboarding exited: {}", reason);
        *self.target.borrow_mut() = Some(exit_url(destination, reason));
    }
}

fn cmd_onboard(
    config: &Config,
    store: &DraftStore,
    reference: ReferenceData,
    fresh: bool,
    today: NaiveDate,
) -> Result<()> {
    let target = Rc::new(RefCell::new(None));
    let exit = Box::new(TerminalExit {
        target: target.clone(),
    });
    let settings = WizardSettings::from_config(config);

    let draft = if fresh { None } else { store.load()? };
    let mut wizard = match draft {
        Some(draft) => {
            println!("Welcome back! Picking up where you left off.");
            Wizard::resume(draft, reference, settings, exit, today)
        }
        None => Wizard::new(reference, settings, exit, today),
    };

    let mut gateway = SimulatedGateway::from_millis(config.booking.payment_delay_ms);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while !wizard.is_closed() {
        display_step(&wizard);
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!("\nInput closed, leaving without saving.");
            wizard.skip(&mut gateway)?;
            break;
        };
        let line = line?;
        let input = line.trim();

        match input {
            ":back" => {
                report(wizard.retreat());
                continue;
            }
            ":later" => {
                if report(wizard.finish_later(store, Utc::now())).is_some() {
                    println!("\n✓ Draft saved. Come back any time to finish.");
                }
                continue;
            }
            ":skip" => {
                wizard.skip(&mut gateway)?;
                continue;
            }
            _ => {}
        }

        if wizard.current_step() == Step::Payment {
            if input.is_empty() || input.eq_ignore_ascii_case("pay") {
                if report(run_payment(&mut wizard, &mut gateway, config)).is_some()
                    && wizard.form().payment_status == PaymentStatus::Success
                {
                    store.clear()?;
                    display_confirmation(&wizard);
                }
            } else {
                println!("  Type 'pay' to confirm, or ':back' to change something.");
            }
            continue;
        }

        if report(apply_answer(&mut wizard, input)).is_some() {
            report(wizard.advance());
        }
    }

    if let Some(url) = target.borrow().as_ref() {
        println!("→ Returning to {}", url);
    }
    Ok(())
}

/// Print a recoverable error; Some(value) on success
fn report<T>(result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            println!("  ! {}", e);
            None
        }
    }
}

/// Resolve a 1-based menu number, or pass the text through
fn choose(options: &[String], input: &str) -> String {
    match input.parse::<usize>() {
        Ok(n) if (1..=options.len()).contains(&n) => options[n - 1].clone(),
        _ => input.to_string(),
    }
}

/// Store the answer for the current step. Empty input keeps the current answer.
fn apply_answer(wizard: &mut Wizard, input: &str) -> Result<()> {
    if input.is_empty() {
        return Ok(());
    }

    let reference = wizard.reference().clone();
    match wizard.current_step() {
        Step::Welcome | Step::Payment => {}
        Step::Name => wizard.set_name(input)?,
        Step::DateOfBirth => {
            let group = wizard.set_dob(input)?;
            tracing::debug!("Age group {:?}", group);
        }
        Step::Gender => {
            let genders: Vec<String> = GENDERS.iter().map(|g| g.to_string()).collect();
            wizard.set_gender(&choose(&genders, input))?;
        }
        Step::City => wizard.set_city(&choose(&reference.cities, input))?,
        Step::Language => wizard.set_language(&choose(&reference.languages, input))?,
        Step::Issues => {
            let picked: Vec<String> = input
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| choose(&reference.issues, s))
                .collect();
            wizard.set_issues(&picked)?;
        }
        Step::DayPreference => {
            let options: Vec<String> = vec!["Weekdays".into(), "Weekends".into(), "Flexible".into()];
            wizard.set_day_pref(choose(&options, input).parse()?)?;
        }
        Step::TimePreference => {
            let options: Vec<String> = vec!["Morning".into(), "Evening".into(), "Flexible".into()];
            wizard.set_time_pref(choose(&options, input).parse()?)?;
        }
        Step::Package => {
            let package = match input.parse::<usize>() {
                Ok(n) if (1..=reference.packages.len()).contains(&n) => reference.packages[n - 1].id,
                _ => input.parse()?,
            };
            wizard.set_package(package)?;
        }
        Step::Slot => {
            let slot_id = match input.parse::<usize>() {
                Ok(n) if (1..=wizard.slots().len()).contains(&n) => wizard.slots()[n - 1].id.clone(),
                _ => input.to_string(),
            };
            wizard.select_slot(&slot_id)?;
        }
    }
    Ok(())
}

fn run_payment(
    wizard: &mut Wizard,
    gateway: &mut SimulatedGateway,
    config: &Config,
) -> Result<()> {
    wizard.start_payment(gateway, Utc::now())?;
    println!("\nProcessing payment...");

    let interval = std::time::Duration::from_millis(config.booking.poll_interval_ms);
    while wizard.poll_payment(gateway, Utc::now())? == PaymentStatus::Processing {
        std::thread::sleep(interval);
    }
    Ok(())
}

fn display_step(wizard: &Wizard) {
    let def = wizard.current();
    let form = wizard.form();

    println!();
    println!(
        "── Step {}/{} · {}% ─────────────────────────",
        wizard.step() + 1,
        TOTAL_STEPS,
        wizard.progress()
    );
    println!("{}", def.prompt);

    match def.step {
        Step::Welcome => {
            println!("  Press Enter to begin.");
            println!("  At any prompt: ':back' to go back, ':later' to save and leave, ':skip' to leave.");
        }
        Step::Name => show_current(&form.name),
        Step::DateOfBirth => show_current(&form.dob),
        Step::Gender => {
            list_options(GENDERS.iter().copied(), |g| form.gender.as_deref() == Some(g));
        }
        Step::City => {
            list_options(wizard.reference().cities.iter().map(String::as_str), |c| {
                form.city == c
            });
        }
        Step::Language => {
            list_options(wizard.reference().languages.iter().map(String::as_str), |l| {
                form.language == l
            });
        }
        Step::Issues => {
            println!("  (comma-separated, e.g. 1,3)");
            list_options(wizard.reference().issues.iter().map(String::as_str), |i| {
                form.issues.contains(i)
            });
        }
        Step::DayPreference => {
            list_options(["Weekdays", "Weekends", "Flexible"], |d| {
                form.day_pref.to_string() == d
            });
        }
        Step::TimePreference => {
            list_options(["Morning", "Evening", "Flexible"], |t| {
                form.time_pref.to_string() == t
            });
        }
        Step::Package => {
            if let Some(clinician) = wizard.assigned_clinician() {
                println!("  You've been matched with {} ({:?})", clinician.name, clinician.role);
                println!("  {}", clinician.bio);
                println!();
            }
            for (i, package) in wizard.reference().packages.iter().enumerate() {
                let mark = if form.package == Some(package.id) { "*" } else { " " };
                println!(
                    " {}{:>2}. {:<30} ₹{}",
                    mark,
                    i + 1,
                    package.name,
                    package.price_inr
                );
            }
        }
        Step::Slot => {
            for (i, slot) in wizard.slots().iter().enumerate() {
                let mark = if form.slot_id.as_deref() == Some(slot.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!(
                    " {}{:>2}. {} {}",
                    mark,
                    i + 1,
                    slot.date.format("%a %d %b"),
                    slot.time.format("%H:%M")
                );
            }
        }
        Step::Payment => display_summary(wizard),
    }
}

fn show_current(value: &str) {
    if !value.is_empty() {
        println!("  (current: {} - press Enter to keep)", value);
    }
}

fn list_options<'a>(options: impl IntoIterator<Item = &'a str>, selected: impl Fn(&str) -> bool) {
    for (i, option) in options.into_iter().enumerate() {
        let mark = if selected(option) { "*" } else { " " };
        println!(" {}{:>2}. {}", mark, i + 1, option);
    }
}

fn display_summary(wizard: &Wizard) {
    let form = wizard.form();
    let package = form.package.and_then(|id| wizard.reference().package(id));

    if let Some(clinician) = wizard.assigned_clinician() {
        println!("  Clinician: {} ({})", clinician.name, clinician.id);
    }
    if let Some(slot) = wizard.selected_slot() {
        println!(
            "  Session:   {} at {}",
            slot.date.format("%A %d %B %Y"),
            slot.time.format("%H:%M")
        );
    }
    if let Some(package) = package {
        println!("  Package:   {}", package.name);
        println!("  Amount:    ₹{}", package.price_inr);
    }
    println!();
    println!("  Type 'pay' (or press Enter) to confirm.");
}

fn display_confirmation(wizard: &Wizard) {
    let form = wizard.form();
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  Booking confirmed!");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Thank you, {}.", form.name);
    if let Some(clinician) = wizard.assigned_clinician() {
        println!("  Clinician: {}", clinician.name);
    }
    if let Some(slot) = wizard.selected_slot() {
        println!(
            "  Session:   {} at {}",
            slot.date.format("%A %d %B %Y"),
            slot.time.format("%H:%M")
        );
    }
    println!("  Meeting:   {}", form.meeting_link);
    println!();
}

// ============================================================================
// Lookups
// ============================================================================

fn cmd_roster(reference: &ReferenceData) -> Result<()> {
    for clinician in &reference.clinicians {
        let flag = |on: bool, label: &'static str| if on { label } else { "-" };
        println!(
            "{:<8} {:<20} {:<13} {} {} {} {} {}",
            clinician.id,
            clinician.name,
            format!("{:?}", clinician.role),
            flag(clinician.weekday, "weekdays"),
            flag(clinician.weekend, "weekends"),
            flag(clinician.morning, "morning"),
            flag(clinician.evening, "evening"),
            flag(clinician.accepts_child, "children"),
        );
    }
    Ok(())
}

fn cmd_match(
    reference: &ReferenceData,
    day: DayPreference,
    time: TimePreference,
    dob: Option<String>,
    today: NaiveDate,
) -> Result<()> {
    let age_group = match dob {
        Some(dob) => Some(infer_age_group(&dob, today)?),
        None => None,
    };

    let eligible = eligible_clinicians(&reference.clinicians, day, time, age_group);
    let Some(assigned) = assign_doctor(&reference.clinicians, day, time, age_group) else {
        return Err(Error::NoMatchingClinician {
            day,
            time,
            age: age_group,
        });
    };

    println!("Preferences: {} / {} ({:?})", day, time, age_group);
    println!(
        "Eligible:    {}",
        eligible
            .iter()
            .map(|c| c.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Assigned:    {} - {}", assigned.id, assigned.name);
    Ok(())
}

fn cmd_slots(reference: &ReferenceData, clinician_id: &str, today: NaiveDate) -> Result<()> {
    let clinician = reference
        .clinician(clinician_id)
        .ok_or_else(|| Error::Validation(format!("Unknown clinician '{}'", clinician_id)))?;

    println!("Slots for {} from {}:", clinician.name, today);
    for slot in generate_slots(&clinician.id, today) {
        println!(
            "  {}  {} {}",
            slot.id,
            slot.date.format("%a %d %b"),
            slot.time.format("%H:%M")
        );
    }
    Ok(())
}

fn cmd_draft(store: &DraftStore, action: DraftAction) -> Result<()> {
    match action {
        DraftAction::Show => match store.load()? {
            Some(draft) => println!("{}", serde_json::to_string_pretty(&draft)?),
            None => println!("No saved draft."),
        },
        DraftAction::Clear => {
            if store.clear()? {
                println!("✓ Draft removed");
            } else {
                println!("No saved draft.");
            }
        }
    }
    Ok(())
}
