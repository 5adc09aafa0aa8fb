//! Shared per-group whiteboard.
//!
//! Every client keeps the last snapshot of `whiteboards/{group}` and repaints
//! it in full whenever it changes. Local strokes are painted as the pointer
//! moves and published as one line when the pointer is released.

use std::sync::Arc;

use crate::{
    db::{WhiteboardLine, WhiteboardPoint},
    AppResult,
};

use super::{
    store::{whiteboard_path, RealtimeStore, Snapshot, Subscription},
    surface::{parse_color, Rgba, Surface, BLACK},
};

pub const DEFAULT_COLOR: &str = "#000000";
pub const DEFAULT_BRUSH_SIZE: f32 = 5.0;

/// Decodes a whiteboard snapshot in key order, skipping bad records.
pub fn lines_from_snapshot(snapshot: Snapshot) -> Vec<WhiteboardLine> {
    snapshot
        .into_iter()
        .filter_map(|(key, value)| match serde_json::from_value::<WhiteboardLine>(value) {
            Ok(line) => Some(WhiteboardLine { id: key, ..line }),
            Err(e) => {
                tracing::warn!("skipping malformed whiteboard record {key}: {e}");
                None
            }
        })
        .collect()
}

/// Stores `line` unless it has fewer than two points.
pub async fn publish_line(store: &RealtimeStore, group_id: i64, line: &WhiteboardLine) -> AppResult<Option<String>> {
    if line.points.len() < 2 {
        return Ok(None);
    }
    let stored = WhiteboardLine { id: String::new(), ..line.clone() };
    Ok(Some(store.push(&whiteboard_path(group_id), &stored).await?))
}

/// Wipes the group's board for every client.
pub async fn clear_board(store: &RealtimeStore, group_id: i64) {
    store.remove(&whiteboard_path(group_id)).await;
    tracing::info!("cleared whiteboard for group {group_id}");
}

fn color_of(color: &str) -> Rgba {
    parse_color(color).unwrap_or_else(|| {
        tracing::debug!("unparseable stroke color {color:?}, using black");
        BLACK
    })
}

fn paint_line<S: Surface + ?Sized>(surface: &mut S, line: &WhiteboardLine) {
    surface.stroke(&line.points, color_of(&line.color), line.brush_size);
}

/// In-process whiteboard client painting onto a [`Surface`]. Browsers draw
/// on their own canvas and reach the same path through `/g/{id}/board/ws`,
/// which shares `publish_line`, `clear_board` and `lines_from_snapshot`.
pub struct Whiteboard<S> {
    group_id: i64,
    store: Arc<RealtimeStore>,
    subscription: Subscription,
    surface: Option<S>,
    /// Last snapshot received; `None` until the first one arrives.
    lines: Option<Vec<WhiteboardLine>>,
    drawing: bool,
    current: Vec<WhiteboardPoint>,
    pub color: String,
    pub brush_size: f32,
}

impl<S: Surface> Whiteboard<S> {
    pub fn open(store: &Arc<RealtimeStore>, group_id: i64) -> Self {
        Self {
            group_id,
            store: Arc::clone(store),
            subscription: store.subscribe(whiteboard_path(group_id)),
            surface: None,
            lines: None,
            drawing: false,
            current: Vec::new(),
            color: DEFAULT_COLOR.to_owned(),
            brush_size: DEFAULT_BRUSH_SIZE,
        }
    }

    /// Attaches a surface and paints what is already known.
    pub fn mount(&mut self, surface: S) {
        self.surface = Some(surface);
        self.redraw();
    }

    pub fn unmount(&mut self) -> Option<S> {
        self.drawing = false;
        self.current.clear();
        self.surface.take()
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn lines(&self) -> &[WhiteboardLine] {
        self.lines.as_deref().unwrap_or_default()
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Container size changed. The surface loses its paint, so the last
    /// snapshot is replayed once it has been received.
    pub fn resize(&mut self, width: u32, height: u32) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        surface.resize(width, height);
        if self.lines.is_some() {
            self.redraw();
        }
    }

    /// Waits for the next snapshot and repaints. `false` once the
    /// subscription has ended.
    pub async fn sync(&mut self) -> bool {
        match self.subscription.next().await {
            Some(snapshot) => {
                self.apply_snapshot(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.lines = Some(lines_from_snapshot(snapshot));
        self.redraw();
    }

    fn redraw(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        surface.clear();
        for line in self.lines.iter().flatten() {
            paint_line(surface, line);
        }
    }

    pub fn pointer_down(&mut self, at: WhiteboardPoint) {
        self.drawing = true;
        self.current = vec![at];
    }

    pub fn pointer_move(&mut self, to: WhiteboardPoint) {
        if !self.drawing {
            return;
        }
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if let Some(&from) = self.current.last() {
            surface.stroke(&[from, to], color_of(&self.color), self.brush_size);
        }
        self.current.push(to);
    }

    /// Ends the stroke and publishes it if it has at least two points.
    pub async fn pointer_up(&mut self) -> AppResult<Option<String>> {
        let points = std::mem::take(&mut self.current);
        let was_drawing = std::mem::replace(&mut self.drawing, false);
        if !was_drawing {
            return Ok(None);
        }

        let line = WhiteboardLine {
            id: String::new(),
            points,
            color: self.color.clone(),
            brush_size: self.brush_size,
        };
        publish_line(&self.store, self.group_id, &line).await
    }

    /// The pointer left the surface; same as releasing it.
    pub async fn pointer_leave(&mut self) -> AppResult<Option<String>> {
        self.pointer_up().await
    }

    pub async fn clear(&self) {
        clear_board(&self.store, self.group_id).await;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::time::{timeout, Duration};

    use crate::realtime::surface::{Raster, TRANSPARENT};

    use super::*;

    fn pt(x: f32, y: f32) -> WhiteboardPoint {
        WhiteboardPoint::new(x, y)
    }

    fn board(store: &Arc<RealtimeStore>, group_id: i64) -> Whiteboard<Raster> {
        let mut board = Whiteboard::open(store, group_id);
        board.mount(Raster::new(40, 40));
        board
    }

    async fn synced(board: &mut Whiteboard<Raster>) {
        assert!(timeout(Duration::from_secs(1), board.sync()).await.unwrap());
    }

    #[tokio::test]
    async fn single_point_stroke_is_never_stored() {
        let store = Arc::new(RealtimeStore::new(8));
        let mut board = board(&store, 1);

        board.pointer_down(pt(5.0, 5.0));
        assert_eq!(board.pointer_up().await.unwrap(), None);
        assert!(!board.is_drawing());

        // release without press
        assert_eq!(board.pointer_up().await.unwrap(), None);
        assert!(store.snapshot(&whiteboard_path(1)).await.is_empty());
    }

    #[tokio::test]
    async fn stroke_paints_locally_then_publishes() {
        let store = Arc::new(RealtimeStore::new(8));
        let mut board = board(&store, 1);
        board.color = "#ff0000".to_owned();
        board.brush_size = 3.0;

        board.pointer_down(pt(5.0, 20.0));
        board.pointer_move(pt(20.0, 20.0));
        board.pointer_move(pt(35.0, 20.0));
        assert_eq!(board.surface().unwrap().pixel(12, 20), Some([255, 0, 0, 255]));

        let key = board.pointer_leave().await.unwrap().unwrap();
        let lines = lines_from_snapshot(store.snapshot(&whiteboard_path(1)).await);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].id, key);
        assert_eq!(lines[0].points.len(), 3);
        assert_eq!(lines[0].color, "#ff0000");
        assert_eq!(lines[0].brush_size, 3.0);
    }

    #[tokio::test]
    async fn unmounted_board_skips_quietly() {
        let store = Arc::new(RealtimeStore::new(8));
        let mut board: Whiteboard<Raster> = Whiteboard::open(&store, 1);

        board.resize(100, 100);
        board.pointer_down(pt(1.0, 1.0));
        board.pointer_move(pt(9.0, 9.0));
        board.apply_snapshot(Snapshot::new());
        assert_eq!(board.pointer_up().await.unwrap(), None);
        assert!(board.surface().is_none());
    }

    #[tokio::test]
    async fn remote_strokes_replay_on_every_client() {
        let store = Arc::new(RealtimeStore::new(8));
        let mut mine = board(&store, 1);
        let mut theirs = board(&store, 1);
        synced(&mut mine).await;
        synced(&mut theirs).await;

        mine.pointer_down(pt(2.0, 2.0));
        mine.pointer_move(pt(30.0, 2.0));
        mine.pointer_up().await.unwrap().unwrap();

        synced(&mut theirs).await;
        assert_eq!(theirs.lines().len(), 1);
        assert_eq!(theirs.surface().unwrap().pixel(15, 2), Some(BLACK));
    }

    #[tokio::test]
    async fn resize_replays_last_snapshot() {
        let store = Arc::new(RealtimeStore::new(8));
        store
            .push(&whiteboard_path(1), json!({ "points": [{"x": 0, "y": 10}, {"x": 60, "y": 10}], "color": "#00f", "brushSize": 4 }))
            .await
            .unwrap();

        let mut board = board(&store, 1);
        // before any snapshot a resize leaves the surface blank
        board.resize(50, 50);
        assert_eq!(board.surface().unwrap().painted(), 0);

        synced(&mut board).await;
        board.resize(80, 30);
        let surface = board.surface().unwrap();
        assert_eq!(surface.size(), (80, 30));
        assert_eq!(surface.pixel(55, 10), Some([0, 0, 255, 255]));
        assert_eq!(surface.pixel(70, 10), Some(TRANSPARENT));
    }

    #[tokio::test]
    async fn clear_wipes_only_this_group() {
        let store = Arc::new(RealtimeStore::new(8));
        let mut first = board(&store, 1);
        let mut other = board(&store, 2);
        synced(&mut first).await;

        for board in [&mut first, &mut other] {
            board.pointer_down(pt(1.0, 1.0));
            board.pointer_move(pt(10.0, 10.0));
            board.pointer_up().await.unwrap().unwrap();
        }
        synced(&mut first).await;
        assert!(first.surface().unwrap().painted() > 0);

        first.clear().await;
        synced(&mut first).await;
        assert!(first.lines().is_empty());
        assert_eq!(first.surface().unwrap().painted(), 0);
        assert_eq!(store.snapshot(&whiteboard_path(2)).await.len(), 1);
    }
}
