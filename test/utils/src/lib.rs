/// A full answer generation run as the server flushes it, including keep-alive
/// lines and one corrupt event.
pub fn generation_stream_fixture() -> &'static str {
    return r#"
: keep-alive

data: {"type":"info","content":"开始生成答案，共 10 道题目"}

data: {"type":"progress","content":"5/10","successCount":5,"total":10}
data: {"type":"progress","content":"6/10"
data: {"type":"error","content":"题目 7 生成失败"}

data: {"type":"complete","content":"done","successCount":9,"failedCount":1,"total":10}
"#
    .trim_start();
}

/// Chat deltas for a single assistant turn, split the way the tutor service
/// flushes them.
pub fn chat_stream_fixture() -> &'static str {
    return r#"
data: {"type":"content","content":"Hel"}

data: {"type":"content","content":"lo, "}

data: not json at all
data: {"type":"content","content":"world"}

"#
    .trim_start();
}
