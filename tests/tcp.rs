use iterpaxos::net::{bind, serve};
use iterpaxos::{
    Ballot, Configuration, IterationDriver, SharedAcceptor, TcpTransport, Value,
};
use std::collections::HashSet;

async fn start_acceptors(n: usize) -> (Configuration, Vec<SharedAcceptor>) {
    let mut members = Vec::new();
    let mut acceptors = Vec::new();
    for id in 0..n {
        let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let acceptor = SharedAcceptor::default();
        tokio::spawn(serve(listener, acceptor.clone()));
        members.push((id as u32, addr));
        acceptors.push(acceptor);
    }
    (Configuration::new(members).unwrap(), acceptors)
}

#[tokio::test]
async fn decides_bounded_iterations_over_tcp() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (config, acceptors) = start_acceptors(5).await;
    let config = config.with_iterations(25);
    let transport = TcpTransport::connect(&config).await.unwrap();

    let values = |b: Ballot| Value::from(b.iteration * 1000 + b.counter);
    let summary = IterationDriver::new(&config, transport, values)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.decisions.len(), 25);
    let iterations: Vec<u64> = summary.decisions.iter().map(|d| d.iteration).collect();
    assert_eq!(iterations, (1..=25).collect::<Vec<_>>());

    // one value per iteration, chosen under that iteration's ballot
    let distinct: HashSet<&Value> = summary.decisions.iter().map(|d| &d.value).collect();
    assert_eq!(distinct.len(), 25);
    for d in summary.decisions.iter() {
        assert_eq!(d.value, Value::from(d.ballot.iteration * 1000 + d.ballot.counter));
    }

    // a quorum of acceptors holds the last decided value
    let last = summary.decisions.last().unwrap();
    let mut holding = 0;
    for acceptor in acceptors.iter() {
        let state = acceptor.state().await;
        if state.highest_accepted == last.ballot && state.accepted_value.as_ref() == Some(&last.value) {
            holding += 1;
        }
    }
    assert!(holding >= config.quorum_size());
}
