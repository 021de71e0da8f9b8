use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};

use givechain_core::clock::{Clock, SystemClock};
use givechain_core::identity::IdentityService;
use givechain_core::ledger::{
    Campaign, CampaignDraft, CampaignFilter, CampaignPhase, LedgerState, WithdrawalStatus,
    MS_PER_DAY,
};
use givechain_core::netsim::NetworkSimulator;
use givechain_core::snapshot::{JsonFileStore, SnapshotStore};
use givechain_core::transaction::TransactionRecord;
use givechain_core::wallet;
use givechain_core::LedgerError;

#[derive(Parser)]
#[command(name = "givechain", version, about = "Donation ledger over a JSON state file")]
struct Cli {
    /// Path to the ledger state file
    #[arg(long, global = true, default_value = "ledger.json")]
    ledger: PathBuf,

    /// Skip the artificial network delays
    #[arg(long, global = true)]
    no_delay: bool,

    /// Seed the simulated network for reproducible runs
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect a wallet (generates a mock address when none is given)
    Connect {
        #[arg(long)]
        address: Option<String>,
    },
    /// Forget the connected wallet
    Disconnect,
    /// Show the connected wallet address
    Whoami,
    /// Create a campaign owned by the connected wallet
    CreateCampaign(CreateCampaignArgs),
    /// List campaigns
    Campaigns {
        /// Only campaigns created by the connected wallet
        #[arg(long, conflicts_with = "creator")]
        mine: bool,
        #[arg(long)]
        creator: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, value_enum)]
        phase: Option<PhaseArg>,
    },
    /// Show one campaign in full
    Show {
        campaign_id: String,
        #[arg(long)]
        json: bool,
    },
    /// Donate to a campaign from the connected wallet
    Donate { campaign_id: String, amount: String },
    /// Look a transaction hash up on the simulated network
    Verify {
        hash: String,
        /// Check the local ledger instead of the network
        #[arg(long)]
        local: bool,
    },
    /// List the connected wallet's donations
    Transactions {
        #[arg(long)]
        json: bool,
    },
    /// Ask to release raised funds from a campaign
    RequestWithdrawal {
        campaign_id: String,
        amount: String,
        #[arg(long)]
        reason: String,
    },
    /// List withdrawal requests
    Withdrawals {
        #[arg(long)]
        campaign: Option<String>,
    },
    /// Register an approval on a pending withdrawal request
    ApproveWithdrawal { request_id: String },
    /// Reject a pending withdrawal request
    RejectWithdrawal { request_id: String },
    /// Pause an active campaign
    Pause { campaign_id: String },
    /// Cancel an active campaign
    Cancel { campaign_id: String },
    /// Query the identity service for an address
    Identity { address: Option<String> },
}

#[derive(Args)]
struct CreateCampaignArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    category: String,
    /// Funding target in EDU
    #[arg(long)]
    target: String,
    /// Smallest accepted donation in EDU
    #[arg(long, default_value = "10")]
    min_donation: String,
    /// Days until the campaign ends
    #[arg(long, default_value_t = 30)]
    days: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum PhaseArg {
    Active,
    Ended,
}

impl From<PhaseArg> for CampaignPhase {
    fn from(phase: PhaseArg) -> Self {
        match phase {
            PhaseArg::Active => CampaignPhase::Active,
            PhaseArg::Ended => CampaignPhase::Ended,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), LedgerError> {
    let store = JsonFileStore::new(&cli.ledger);
    let clock = SystemClock;
    let (no_delay, seed) = (cli.no_delay, cli.seed);

    match cli.command {
        Command::Connect { address } => {
            let mut state = load(&store)?;
            let address = address.unwrap_or_else(|| wallet::mock_address(&mut rand::thread_rng()));
            state.connect_wallet(address.clone());
            store.save(&state.snapshot())?;
            println!("Wallet connected → {address}");
        }
        Command::Disconnect => {
            let mut state = load(&store)?;
            state.disconnect_wallet();
            store.save(&state.snapshot())?;
            println!("Wallet disconnected");
        }
        Command::Whoami => {
            let state = load(&store)?;
            println!("{}", connected(&state)?);
        }
        Command::CreateCampaign(args) => {
            let mut state = load(&store)?;
            let creator = connected(&state)?;
            let now = clock.now_unix_ms();
            let draft = CampaignDraft {
                title: args.title,
                description: args.description,
                category: args.category,
                target_amount: wallet::parse_edu(&args.target)?,
                min_donation: wallet::parse_edu(&args.min_donation)?,
                end_date_ms: now + args.days * MS_PER_DAY,
            };
            let campaign = state.create_campaign(&creator, draft, now)?;
            store.save(&state.snapshot())?;
            println!("Campaign created → {}", campaign.id);
        }
        Command::Campaigns {
            mine,
            creator,
            category,
            phase,
        } => {
            let state = load(&store)?;
            let now = clock.now_unix_ms();
            let creator = if mine {
                Some(connected(&state)?)
            } else {
                creator
            };
            let filter = CampaignFilter {
                creator,
                category,
                phase: phase.map(Into::into),
            };
            let campaigns = state.list_campaigns(&filter, now);
            if campaigns.is_empty() {
                println!("No campaigns found");
            }
            for campaign in campaigns {
                println!(
                    "{}  [{}]  {}  {}/{} EDU  {} donor(s)  {}",
                    campaign.id,
                    campaign.effective_status(now),
                    campaign.title,
                    wallet::format_edu(campaign.raised_amount),
                    wallet::format_edu(campaign.target_amount),
                    campaign.donor_count,
                    days_left(campaign, now),
                );
            }
        }
        Command::Show { campaign_id, json } => {
            let state = load(&store)?;
            let campaign = find_campaign(&state, &campaign_id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(campaign)?);
            } else {
                let now = clock.now_unix_ms();
                println!("{}: {}", campaign.id, campaign.title);
                println!("  creator     {}", wallet::format_address(&campaign.creator));
                println!("  category    {}", campaign.category);
                println!("  status      {}", campaign.effective_status(now));
                println!(
                    "  raised      {}/{} EDU ({}%)",
                    wallet::format_edu(campaign.raised_amount),
                    wallet::format_edu(campaign.target_amount),
                    progress_percent(campaign),
                );
                println!(
                    "  min gift    {} EDU",
                    wallet::format_edu(campaign.min_donation)
                );
                println!("  donors      {}", campaign.donor_count);
                println!(
                    "  withdrawn   {} EDU ({} EDU available)",
                    wallet::format_edu(campaign.withdrawn_amount),
                    wallet::format_edu(campaign.available_for_withdrawal()),
                );
                println!("  ends        {} ({})", campaign.end_date_ms, days_left(campaign, now));
                println!("  {}", campaign.description);
            }
        }
        Command::Donate {
            campaign_id,
            amount,
        } => {
            let mut state = load(&store)?;
            let donor = connected(&state)?;
            let amount = wallet::parse_edu(&amount)?;
            let recipient = find_campaign(&state, &campaign_id)?.creator.clone();
            let now = clock.now_unix_ms();
            let mut record = TransactionRecord::build(donor, recipient, amount, &campaign_id, now);
            let mut sim = simulator(no_delay, seed);
            let receipt = sim.submit(&record);
            record.seal(&receipt);
            let hash = record.hash.clone();
            state.record_donation(record, now)?;
            store.save(&state.snapshot())?;
            println!(
                "Donation settled → block {} ({} confirmation(s))",
                receipt.block_number, receipt.confirmations
            );
            println!("Transaction hash: {hash}");
        }
        Command::Verify { hash, local } => {
            if local {
                let state = load(&store)?;
                match state.transaction_by_hash(&hash) {
                    Some(tx) => {
                        println!("Found in local ledger → block {}", tx.block_number);
                        println!(
                            "  {} EDU from {} to {} (campaign {})",
                            wallet::format_edu(tx.amount),
                            wallet::format_address(&tx.sender),
                            wallet::format_address(&tx.recipient),
                            tx.campaign_id,
                        );
                    }
                    None => {
                        eprintln!("verification failed: {hash} not found in the local ledger");
                        process::exit(2);
                    }
                }
            } else {
                let mut sim = simulator(no_delay, seed);
                match sim.resolve(&hash, clock.now_unix_ms()) {
                    Some(tx) => {
                        println!("Found on network → block {}", tx.block_number);
                        println!(
                            "  {} EDU from {} to {}  gas {}@{}  ts={}",
                            wallet::format_edu(tx.value),
                            wallet::format_address(&tx.from),
                            wallet::format_address(&tx.to),
                            tx.gas,
                            tx.gas_price,
                            tx.timestamp_ms,
                        );
                    }
                    None => {
                        eprintln!("verification failed: transaction not found on the network");
                        process::exit(2);
                    }
                }
            }
        }
        Command::Transactions { json } => {
            let state = load(&store)?;
            let address = connected(&state)?;
            let transactions = state.user_transactions(&address);
            if json {
                println!("{}", serde_json::to_string_pretty(&transactions)?);
            } else if transactions.is_empty() {
                println!("No transactions found");
            } else {
                for tx in transactions {
                    println!(
                        "{}  {} EDU → {}  block {}  ts={}",
                        tx.hash,
                        wallet::format_edu(tx.amount),
                        tx.campaign_id,
                        tx.block_number,
                        tx.timestamp_ms,
                    );
                }
            }
        }
        Command::RequestWithdrawal {
            campaign_id,
            amount,
            reason,
        } => {
            let mut state = load(&store)?;
            let requester = connected(&state)?;
            let amount = wallet::parse_edu(&amount)?;
            let request = state.request_withdrawal(
                &campaign_id,
                &requester,
                amount,
                &reason,
                clock.now_unix_ms(),
            )?;
            store.save(&state.snapshot())?;
            println!(
                "Withdrawal requested → {} ({} EDU, pending)",
                request.id,
                wallet::format_edu(request.amount)
            );
        }
        Command::Withdrawals { campaign } => {
            let state = load(&store)?;
            let requests = match &campaign {
                Some(id) => state.campaign_withdrawals(id),
                None => state.creator_withdrawals(&connected(&state)?),
            };
            if requests.is_empty() {
                println!("No withdrawal requests found");
            }
            for request in requests {
                println!(
                    "{}  [{}]  {} EDU from {}  {} approval(s)  {}",
                    request.id,
                    request.status,
                    wallet::format_edu(request.amount),
                    request.campaign_id,
                    request.approval_count,
                    request.reason,
                );
            }
        }
        Command::ApproveWithdrawal { request_id } => {
            let mut state = load(&store)?;
            let request = state.approve_withdrawal(&request_id)?;
            store.save(&state.snapshot())?;
            match request.status {
                WithdrawalStatus::Completed => println!(
                    "Withdrawal {} settled → {} EDU released",
                    request.id,
                    wallet::format_edu(request.amount)
                ),
                _ => println!(
                    "Approval recorded → {} ({} so far)",
                    request.id, request.approval_count
                ),
            }
        }
        Command::RejectWithdrawal { request_id } => {
            let mut state = load(&store)?;
            let request = state.reject_withdrawal(&request_id)?;
            store.save(&state.snapshot())?;
            println!("Withdrawal {} rejected", request.id);
        }
        Command::Pause { campaign_id } => {
            let mut state = load(&store)?;
            let actor = connected(&state)?;
            state.pause_campaign(&campaign_id, &actor, clock.now_unix_ms())?;
            store.save(&state.snapshot())?;
            println!("Campaign {campaign_id} paused");
        }
        Command::Cancel { campaign_id } => {
            let mut state = load(&store)?;
            let actor = connected(&state)?;
            state.cancel_campaign(&campaign_id, &actor, clock.now_unix_ms())?;
            store.save(&state.snapshot())?;
            println!("Campaign {campaign_id} cancelled");
        }
        Command::Identity { address } => {
            let state = load(&store)?;
            let address = match address {
                Some(address) => address,
                None => connected(&state)?,
            };
            let mut service = identity_service(no_delay, seed);
            match service.details(&address) {
                Some(profile) => println!(
                    "Identity {} → {} (level {}, {})",
                    profile.id,
                    profile.name,
                    profile.level,
                    if profile.verified { "verified" } else { "unverified" },
                ),
                None => println!(
                    "No identity registered for {}",
                    wallet::format_address(&address)
                ),
            }
        }
    }
    Ok(())
}

fn load(store: &JsonFileStore) -> Result<LedgerState, LedgerError> {
    Ok(LedgerState::restore(store.load()?))
}

fn connected(state: &LedgerState) -> Result<String, LedgerError> {
    state.connected_wallet().map(str::to_string).ok_or_else(|| {
        LedgerError::Validation("no wallet connected; run `givechain connect` first".into())
    })
}

fn find_campaign<'a>(state: &'a LedgerState, id: &str) -> Result<&'a Campaign, LedgerError> {
    state.campaign(id).ok_or_else(|| LedgerError::NotFound {
        what: "campaign",
        id: id.to_string(),
    })
}

fn simulator(no_delay: bool, seed: Option<u64>) -> NetworkSimulator {
    let sim = match seed {
        Some(seed) => NetworkSimulator::seeded(seed),
        None => NetworkSimulator::new(),
    };
    if no_delay {
        sim.without_delays()
    } else {
        sim
    }
}

fn identity_service(no_delay: bool, seed: Option<u64>) -> IdentityService {
    let service = match seed {
        Some(seed) => IdentityService::seeded(seed),
        None => IdentityService::new(),
    };
    if no_delay {
        service.without_delay()
    } else {
        service
    }
}

fn progress_percent(campaign: &Campaign) -> u64 {
    if campaign.target_amount == 0 {
        return 0;
    }
    (campaign.raised_amount.saturating_mul(100) / campaign.target_amount).min(100)
}

fn days_left(campaign: &Campaign, now_ms: u64) -> String {
    if now_ms >= campaign.end_date_ms {
        "ended".to_string()
    } else {
        format!("{}d left", (campaign.end_date_ms - now_ms) / MS_PER_DAY)
    }
}
