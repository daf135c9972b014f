use std::time::Duration;

use newt::blocking::{Client, ClientResultExt};
use newt::net::{Addrd, Socket};
use newt_msg::{code, Code, Id, Message, Type};
use no_std_net::SocketAddr;

/// How often a registration is refreshed
const REFRESH: Duration = Duration::from_secs(3600);

/// How long to wait before registering again after the directory forgot us
const RETRY: Duration = Duration::from_secs(300);

/// What the resource directory said about a request
#[derive(Debug, Default)]
struct Answer {
  code: Option<Code>,
  location: Vec<String>,
}

fn send(client: &mut Client<newt::platform::Std>, req: Addrd<Message<'_>>) -> Answer {
  let mut answer = Answer::default();
  let addr = req.addr();

  let res = client.fetch(req, |rep| {
                    answer.code = Some(rep.data().code);
                    answer.location = rep.data()
                                         .location_path()
                                         .map(|seg| String::from_utf8_lossy(seg).into_owned())
                                         .collect();
                  })
                  .timeout_ok();

  match res {
    | Ok(Some(())) => (),
    | Ok(None) => log::warn!("{} never answered", addr),
    | Err(e) => log::error!("{:?}", e.what),
  }

  answer
}

/// POST /rd?ep=..&rt=.., yielding where the directory put us
fn register(client: &mut Client<newt::platform::Std>, rd: SocketAddr, query: &str) -> Option<String> {
  let mut req = Message::new(Type::Con, code::POST, Id(0));
  req.set_uri_path("rd").ok()?;
  req.set_uri_query(query).ok()?;

  let answer = send(client, Addrd(req, rd));
  let created = answer.code == Some(code::CREATED) || answer.code == Some(code::CHANGED);

  match answer.code {
    | Some(_) if created && !answer.location.is_empty() => {
      let location = answer.location.join("/");
      log::info!("registered at /{}", location);
      Some(location)
    },
    | other => {
      log::warn!("registration failed: {:?}", other);
      None
    },
  }
}

/// PUT to our registration, yielding whether the directory still knows us
fn refresh(client: &mut Client<newt::platform::Std>, rd: SocketAddr, location: &str) -> bool {
  let mut req = Message::new(Type::Con, code::PUT, Id(0));
  if req.set_uri_path(location).is_err() {
    return false;
  }

  let answer = send(client, Addrd(req, rd));
  log::info!("refreshed /{}: {:?}", location, answer.code);
  answer.code == Some(code::CHANGED)
}

fn main() {
  simple_logger::init_with_level(log::Level::Info).unwrap();

  let mut args = std::env::args().skip(1);
  let rd: SocketAddr = match args.next().map(|s| s.parse()) {
    | Some(Ok(addr)) => addr,
    | _ => {
      eprintln!("usage: rd_client <directory address, e.g. 10.0.0.1:5683> [endpoint name]");
      std::process::exit(1);
    },
  };
  let ep = args.next().unwrap_or_else(|| "newt-node".into());
  let query = format!("ep=\"{}\"&rt=\"sensor\"", ep);

  let mut client = Client::new_std(0).unwrap();
  log::info!("registering {} with {} from {}", ep, rd, Socket::local_addr(client.core().sock()));

  loop {
    let location = match register(&mut client, rd, &query) {
      | Some(location) => location,
      | None => {
        std::thread::sleep(RETRY);
        continue;
      },
    };

    loop {
      std::thread::sleep(REFRESH);
      if !refresh(&mut client, rd, &location) {
        break;
      }
    }

    std::thread::sleep(RETRY);
  }
}
