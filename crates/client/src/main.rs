use std::sync::Arc;

use anyhow::{Context, bail};

use gudang_client::bulk::{fetch_all_movements, fetch_all_stock};
use gudang_client::storefront::Storefront;
use gudang_client::{ApiClient, ClientConfig, Command, Dispatcher, ListQuery, Notice, Session};
use gudang_core::{CategoryId, StockId};
use gudang_inventory::MovementKind;

const USAGE: &str = "\
usage: gudang <command> [args]

commands:
  list [--page N] [--search TERM] [--category ID]   stock records (JSON)
  shop [--page N] [--search TERM] [--category ID]   public product cards (JSON)
  stock-out STOCK_ID QTY [REASON] [NOTE]            take units out of stock
  login USERNAME PASSWORD                           print a token for GUDANG_AUTH_TOKEN
  me                                                show the current user
  export-stock                                      every stock record (JSON)
  export-movements [IN|OUT]                         every stock movement (JSON)

environment:
  GUDANG_API_URL, GUDANG_AUTH_TOKEN, GUDANG_AUTH_SCHEME,
  GUDANG_SEARCH_DEBOUNCE_MS, GUDANG_HTTP_TIMEOUT_MS, GUDANG_LOG_FORMAT, RUST_LOG";

fn parse_list_args(args: &[String]) -> anyhow::Result<ListQuery> {
    let mut query = ListQuery::first_page();
    let mut page = 1;
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .with_context(|| format!("{flag} needs a value"))?;
        match flag.as_str() {
            "--page" => page = value.parse().context("--page must be a number")?,
            "--search" => query = query.with_search(value.clone()),
            "--category" => {
                let id: CategoryId = value.parse().context("--category must be an id")?;
                query = query.with_category(Some(id));
            }
            other => bail!("unknown option {other}"),
        }
    }
    Ok(query.with_page(gudang_client::pagination::validate_page(page)?))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(notice: Notice) -> anyhow::Result<()> {
    match notice {
        Notice::Success { message } => {
            println!("{message}");
            Ok(())
        }
        Notice::Failure { message, .. } => bail!(message),
        Notice::Quiet => Ok(()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gudang_observability::init();

    let config = ClientConfig::from_env().context("invalid configuration")?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        println!("{USAGE}");
        return Ok(());
    };

    tracing::debug!(base_url = %config.base_url, command = %command, "starting");

    match command.as_str() {
        "list" => {
            let query = parse_list_args(rest)?;
            let dispatcher = Dispatcher::connect(&config)?;
            dispatcher.stock_view().load(query).await?;
            let state = dispatcher.stock_view().snapshot();
            print_json(&state.items)?;
            eprintln!(
                "page {} of {} ({} records)",
                state.query.page(),
                state.pagination.total_pages.max(1),
                state.pagination.total_count
            );
        }
        "shop" => {
            let query = parse_list_args(rest)?;
            let client = ApiClient::new(&config, Session::new())?;
            let shop = Storefront::new(Arc::new(client), config.base_url.clone());
            shop.browse(query).await?;
            let page = shop.page_with_item_images().await;
            if page.is_empty() {
                eprintln!("Produk tidak ditemukan.");
            }
            print_json(&page.cards)?;
        }
        "stock-out" => {
            let [stock_id, quantity, extra @ ..] = rest else {
                bail!("usage: gudang stock-out STOCK_ID QTY [REASON] [NOTE]");
            };
            let stock_id: StockId = stock_id.parse().context("STOCK_ID must be an id")?;
            let quantity: i64 = quantity.parse().context("QTY must be a number")?;
            let mut request = gudang_client::StockOutRequest::new(stock_id, quantity);
            if let Some(reason) = extra.first() {
                request = request.with_reason(reason.clone());
            }
            if let Some(note) = extra.get(1) {
                request = request.with_note(note.clone());
            }
            let dispatcher = Dispatcher::connect(&config)?;
            report(dispatcher.dispatch(Command::StockOut(request)).await)?;
        }
        "login" => {
            let [username, password] = rest else {
                bail!("usage: gudang login USERNAME PASSWORD");
            };
            let dispatcher = Dispatcher::connect(&config)?;
            dispatcher
                .accounts()
                .login(username, password)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            let token = dispatcher
                .accounts()
                .session()
                .token()
                .context("server issued no token")?;
            println!("{token}");
        }
        "me" => {
            let dispatcher = Dispatcher::connect(&config)?;
            let user = dispatcher.current_user().await;
            println!("{}", user.role_label());
        }
        "export-stock" => {
            let client = ApiClient::new(&config, Session::new())?;
            print_json(&fetch_all_stock(&client).await?)?;
        }
        "export-movements" => {
            let kind = rest
                .first()
                .map(|k| k.parse::<MovementKind>())
                .transpose()
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            let client = ApiClient::new(&config, Session::new())?;
            print_json(&fetch_all_movements(&client, kind).await?)?;
        }
        "help" | "--help" | "-h" => println!("{USAGE}"),
        other => bail!("unknown command '{other}'\n\n{USAGE}"),
    }

    Ok(())
}
