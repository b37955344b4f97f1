use std::io;

use anyhow::Result;
use test_utils::chat_stream_fixture;
use test_utils::generation_stream_fixture;
use tokio_util::io::StreamReader;

use super::EventStream;
use crate::domain::models::EventKind;
use crate::domain::models::StreamEvent;

async fn collect<R>(events: &mut EventStream<R>) -> Result<Vec<StreamEvent>>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut res = vec![];
    while let Some(event) = events.next_event().await? {
        res.push(event);
    }

    return Ok(res);
}

#[tokio::test]
async fn it_reads_events_in_wire_order() -> Result<()> {
    let mut events = EventStream::new(generation_stream_fixture().as_bytes());
    let res = collect(&mut events).await?;

    let kinds = res.iter().map(|e| return e.kind).collect::<Vec<EventKind>>();
    assert_eq!(
        kinds,
        vec![
            EventKind::Info,
            EventKind::Progress,
            EventKind::Error,
            EventKind::Complete
        ]
    );
    assert_eq!(res[3].success_count, Some(9));

    return Ok(());
}

#[tokio::test]
async fn it_keeps_count_and_order_around_malformed_lines() -> Result<()> {
    let clean = "data: {\"type\":\"info\",\"content\":\"a\"}\ndata: {\"type\":\"info\",\"content\":\"b\"}\ndata: {\"type\":\"info\",\"content\":\"c\"}\n";
    let noisy = "data: {\"type\":\"info\",\"content\":\"a\"}\ndata: {oops\ndata: {\"type\":\"info\",\"content\":\"b\"}\ndata: \ndata: {\"content\":\"x\"}\ndata: {\"type\":\"info\",\"content\":\"c\"}\n";

    let clean_res = collect(&mut EventStream::new(clean.as_bytes())).await?;
    let noisy_res = collect(&mut EventStream::new(noisy.as_bytes())).await?;

    assert_eq!(clean_res, noisy_res);

    return Ok(());
}

#[tokio::test]
async fn it_reads_chat_deltas() -> Result<()> {
    let res = collect(&mut EventStream::new(chat_stream_fixture().as_bytes())).await?;
    let text = res
        .iter()
        .map(|e| return e.content.to_string())
        .collect::<String>();

    assert_eq!(text, "Hello, world");

    return Ok(());
}

#[tokio::test]
async fn it_handles_multiple_lines_per_chunk_and_lines_across_chunks() -> Result<()> {
    let chunks: Vec<io::Result<&[u8]>> = vec![
        Ok(&b"data: {\"type\":\"content\",\"content\":\"a\"}\ndata: {\"type\":\"con"[..]),
        Ok(&b"tent\",\"content\":\"b\"}\r\n\r\n"[..]),
        Ok(&b"data: {\"type\":\"content\",\"content\":\"c\"}"[..]),
    ];
    let mut events = EventStream::new(StreamReader::new(futures::stream::iter(chunks)));
    let res = collect(&mut events).await?;

    let text = res
        .iter()
        .map(|e| return e.content.to_string())
        .collect::<String>();
    assert_eq!(text, "abc");

    return Ok(());
}

#[tokio::test]
async fn it_ends_cleanly_on_empty_bodies() -> Result<()> {
    let mut events = EventStream::new("".as_bytes());

    assert_eq!(events.next_event().await?, None);
    assert_eq!(events.next_line().await?, None);

    return Ok(());
}

#[tokio::test]
async fn it_decodes_invalid_utf8_lossily() -> Result<()> {
    let body: &[u8] = b"\xff\xfe garbage\ndata: {\"type\":\"info\",\"content\":\"ok\"}\n";
    let res = collect(&mut EventStream::new(body)).await?;

    assert_eq!(res, vec![StreamEvent::new(EventKind::Info, "ok")]);

    return Ok(());
}

#[tokio::test]
async fn it_surfaces_transport_failures() -> Result<()> {
    let chunks: Vec<io::Result<&[u8]>> = vec![
        Ok(&b"data: {\"type\":\"info\",\"content\":\"start\"}\n"[..]),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
    ];
    let mut events = EventStream::new(StreamReader::new(futures::stream::iter(chunks)));

    let first = events.next_event().await?;
    assert_eq!(first, Some(StreamEvent::new(EventKind::Info, "start")));

    let err = events.next_event().await.unwrap_err();
    assert_eq!(err.to_string(), "connection reset");

    return Ok(());
}
