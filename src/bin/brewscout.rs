//! Command-line shell over the directory session.
//!
//! Each invocation is one session: the catalog is loaded, the overlay is
//! rehydrated from the snapshot file (`--snapshot` or `BREWSCOUT_SNAPSHOT`),
//! one command runs, and mutating commands hand the overlay back to the
//! snapshot file before exiting. Deletions are remembered in a companion
//! `.undo.json` file so `restore` can bring the latest one back.

use anyhow::{Context, Result, bail};
use brewscout::{
    CatalogSummary, DirectoryConfig, DirectorySession, FacetFilter, ReviewDraft, ReviewId, ShopId,
    ShopView, init_logging, parse_facet_list,
};
use chrono::Utc;
use serde_json::{Value, json};
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse(env::args_os().skip(1))?;
    let mut config = DirectoryConfig::from_env()?;
    if let Some(path) = &cli.snapshot {
        config.snapshot_path = Some(path.clone());
    }

    let mut session = DirectorySession::open(&config)?;
    let output = execute(&cli.command, &mut session)?;
    if cli.command.mutates() {
        session.persist(&config)?;
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output.json)?);
    } else {
        print!("{}", output.text);
    }
    Ok(())
}

#[derive(Debug, PartialEq)]
enum Command {
    Search { term: String, filters: FacetFilter },
    Show { shop: ShopId },
    Review { shop: ShopId, draft: ReviewDraft },
    Delete { shop: ShopId, review: ReviewId },
    Restore { shop: ShopId },
    Stats,
}

impl Command {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Command::Review { .. } | Command::Delete { .. } | Command::Restore { .. }
        )
    }
}

#[derive(Debug)]
struct Cli {
    command: Command,
    snapshot: Option<PathBuf>,
    json: bool,
}

struct Output {
    text: String,
    json: Value,
}

impl Cli {
    fn parse(args: impl IntoIterator<Item = OsString>) -> Result<Self> {
        let mut args = args.into_iter();
        let Some(name) = args.next() else {
            usage(1);
        };
        let name = name
            .into_string()
            .map_err(|_| anyhow::anyhow!("command is not valid UTF-8"))?;
        if matches!(name.as_str(), "--help" | "-h") {
            usage(0);
        }

        let mut snapshot = None;
        let mut json = false;
        let mut term = String::new();
        let mut filters = FacetFilter::new();
        let mut shop: Option<ShopId> = None;
        let mut review: Option<ReviewId> = None;
        let mut rating: Option<u8> = None;
        let mut comment: Option<String> = None;

        while let Some(arg_os) = args.next() {
            let arg = arg_os
                .into_string()
                .map_err(|_| anyhow::anyhow!("argument is not valid UTF-8"))?;
            match arg.as_str() {
                "--snapshot" => snapshot = Some(PathBuf::from(next_value(&mut args, "--snapshot")?)),
                "--json" => json = true,
                "--term" => term = next_value(&mut args, "--term")?,
                "--facets" => filters = parse_facet_list(&next_value(&mut args, "--facets")?)?,
                "--shop" => shop = Some(ShopId(next_value(&mut args, "--shop")?)),
                "--review" => review = Some(ReviewId(next_value(&mut args, "--review")?)),
                "--rating" => {
                    let raw = next_value(&mut args, "--rating")?;
                    rating = Some(
                        raw.parse()
                            .with_context(|| format!("--rating must be 1-5, got '{raw}'"))?,
                    );
                }
                "--comment" => comment = Some(next_value(&mut args, "--comment")?),
                "--help" | "-h" => usage(0),
                other => bail!("unknown flag: {other}"),
            }
        }

        let require_shop = |shop: Option<ShopId>| shop.context("--shop is required");
        let command = match name.as_str() {
            "search" => Command::Search { term, filters },
            "show" => Command::Show {
                shop: require_shop(shop)?,
            },
            "review" => Command::Review {
                shop: require_shop(shop)?,
                draft: ReviewDraft::new(
                    rating.context("--rating is required")?,
                    comment.context("--comment is required")?,
                ),
            },
            "delete" => Command::Delete {
                shop: require_shop(shop)?,
                review: review.context("--review is required")?,
            },
            "restore" => Command::Restore {
                shop: require_shop(shop)?,
            },
            "stats" => Command::Stats,
            other => bail!("unknown command: {other}"),
        };

        Ok(Self {
            command,
            snapshot,
            json,
        })
    }
}

fn execute(command: &Command, session: &mut DirectorySession) -> Result<Output> {
    match command {
        Command::Search { term, filters } => {
            session.set_search_term(term.clone());
            session.set_filters(filters.clone());
            let views = session.list_views();
            if views.is_empty() {
                return Ok(Output {
                    text: "No coffee shops found. Try adjusting your search or filters.\n".into(),
                    json: json!({"results": []}),
                });
            }
            let text = views.iter().map(listing_line).collect::<String>();
            let json = json!({"results": views.iter().map(view_json).collect::<Vec<_>>()});
            Ok(Output { text, json })
        }
        Command::Show { shop } => {
            let view = session
                .shop_view(shop)
                .with_context(|| format!("no coffee shop with id {shop}"))?;
            Ok(Output {
                text: detail_text(&view),
                json: view_json(&view),
            })
        }
        Command::Review { shop, draft } => {
            let review = session.submit_review(shop, draft, Utc::now())?;
            Ok(Output {
                text: format!("Review submitted ({})\n", review.id),
                json: serde_json::to_value(&review)?,
            })
        }
        Command::Delete { shop, review } => {
            let removed = session
                .delete_own_review(shop, review)
                .with_context(|| format!("no review {review} of yours on shop {shop}"))?;
            Ok(Output {
                text: format!("Review deleted ({})\n", removed.id),
                json: serde_json::to_value(&removed)?,
            })
        }
        Command::Restore { shop } => {
            let restored = session
                .restore_last_deleted(shop)
                .with_context(|| format!("no deleted review to restore on shop {shop}"))?;
            Ok(Output {
                text: format!("Review restored ({})\n", restored.id),
                json: serde_json::to_value(&restored)?,
            })
        }
        Command::Stats => {
            let summary = CatalogSummary::from_index(session.catalog());
            let mut text = format!(
                "{} shops, {} seed reviews, {} of your reviews\n",
                summary.shops,
                summary.seed_reviews,
                session.overlay().len()
            );
            for (facet, count) in &summary.facets {
                text.push_str(&format!("  {:<18} {count}\n", facet.label()));
            }
            text.push_str(&format!("  cities: {}\n", summary.cities.join(", ")));
            Ok(Output {
                text,
                json: serde_json::to_value(&summary)?,
            })
        }
    }
}

fn listing_line(view: &ShopView<'_>) -> String {
    let shop = view.shop;
    format!(
        "[{}] {} ({}) {} stars, {} reviews\n",
        shop.id,
        shop.name,
        shop.location.city,
        view.summary.display_rating(),
        view.summary.review_count()
    )
}

fn detail_text(view: &ShopView<'_>) -> String {
    let shop = view.shop;
    let mut text = format!(
        "{}\n{}, {}, {} {}\nOpen {} - {}\nRating {} ({} reviews)\n",
        shop.name,
        shop.location.address,
        shop.location.city,
        shop.location.state,
        shop.location.zip,
        shop.hours.open,
        shop.hours.close,
        view.summary.display_rating(),
        view.summary.review_count()
    );
    let amenities: Vec<&str> = shop.amenities.offered().map(|f| f.label()).collect();
    if !amenities.is_empty() {
        text.push_str(&format!("Amenities: {}\n", amenities.join(", ")));
    }
    if !shop.specialties.is_empty() {
        text.push_str(&format!("Specialties: {}\n", shop.specialties.join(", ")));
    }
    for review in &view.summary.reviews {
        text.push_str(&format!(
            "  {} [{}] {}/5: {}\n",
            review.user, review.id, review.rating, review.comment
        ));
    }
    text
}

fn view_json(view: &ShopView<'_>) -> Value {
    json!({
        "id": view.shop.id,
        "name": view.shop.name,
        "city": view.shop.location.city,
        "rating": view.summary.rating,
        "display_rating": view.summary.display_rating(),
        "amenities": view.shop.amenities,
        "reviews": view.summary.reviews,
    })
}

fn next_value(args: &mut impl Iterator<Item = OsString>, flag: &str) -> Result<String> {
    args.next()
        .map(|os| {
            os.into_string()
                .map_err(|_| anyhow::anyhow!("value for {flag} is not valid UTF-8"))
        })
        .transpose()?
        .ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))
}

fn usage(code: i32) -> ! {
    eprintln!(
        "Usage: brewscout <command> [--snapshot PATH] [--json] [args]\n\nCommands:\n  search  [--term TEXT] [--facets wifi,seating,powerOutlets,quietSpace]\n  show    --shop ID\n  review  --shop ID --rating 1-5 --comment TEXT\n  delete  --shop ID --review ID\n  restore --shop ID\n  stats\n\nEnvironment:\n  BREWSCOUT_CATALOG   catalog file (default: data/coffee_shops.json or bundled)\n  BREWSCOUT_SNAPSHOT  overlay snapshot file read at start, written after changes\n  BREWSCOUT_LOG       log filter (default: warn)"
    );
    std::process::exit(code);
}
