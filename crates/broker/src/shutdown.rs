use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy)]
pub enum CancelSignal {
    /// First Ctrl-C: ask the running job to cancel.
    Cancel,
    /// Second Ctrl-C: leave immediately.
    Exit,
}

pub fn spawn_ctrl_c_handler(tx: mpsc::UnboundedSender<CancelSignal>) {
    tokio::spawn(async move {
        let mut hits = 0u8;
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            hits += 1;
            if hits == 1 {
                let _ = tx.send(CancelSignal::Cancel);
            } else {
                let _ = tx.send(CancelSignal::Exit);
                return;
            }
        }
    });
}
