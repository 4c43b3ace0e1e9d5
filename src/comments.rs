use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::storage::CommentRow;

/// 嵌套评论节点
///
/// 子节点按创建时间升序，时间相同时保持输入顺序。
#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    pub id: Uuid,
    pub slug: String,
    pub name: Option<String>,
    pub message: String,
    pub created_at: Option<DateTime<Utc>>,
    pub parent_id: Option<Uuid>,
    pub likes: i32,
    pub children: Vec<CommentNode>,
}

/// 一篇文章的评论森林
///
/// 每次读取都从平铺行重新构建，从不落库。
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct CommentThread {
    roots: Vec<CommentNode>,
}

impl CommentThread {
    /// 由平铺评论行构建评论森林。
    ///
    /// 索引阶段按 id 建表；挂载阶段把每条评论接到父节点上，
    /// 以下情况一律降级为根节点，保证森林总能渲染且节点数等于输入数：
    ///
    /// - `parent_id` 为空
    /// - `parent_id` 指向自身
    /// - `parent_id` 指向不存在（或未加载）的评论
    /// - 挂载会构成环（如两条评论互为父节点）
    pub fn build(rows: Vec<CommentRow>) -> Self {
        let index: HashMap<Uuid, usize> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.id, i))
            .collect();

        let mut parent_of: Vec<Option<usize>> = vec![None; rows.len()];
        let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); rows.len()];
        let mut roots: Vec<usize> = Vec::new();

        for (i, row) in rows.iter().enumerate() {
            let parent = row
                .parent_id
                .filter(|pid| *pid != row.id)
                .and_then(|pid| index.get(&pid).copied())
                .filter(|p| !is_ancestor(&parent_of, *p, i));

            match parent {
                Some(p) => {
                    parent_of[i] = Some(p);
                    children_of[p].push(i);
                }
                None => roots.push(i),
            }
        }

        let sort_key = |i: &usize| rows[*i].created_at.unwrap_or_default();
        roots.sort_by_key(sort_key);
        for children in &mut children_of {
            children.sort_by_key(sort_key);
        }

        let mut slots: Vec<Option<CommentRow>> = rows.into_iter().map(Some).collect();
        let roots = roots
            .iter()
            .map(|&i| materialize(i, &mut slots, &children_of))
            .collect();

        Self { roots }
    }

    pub fn roots(&self) -> &[CommentNode] {
        &self.roots
    }

    /// 森林中的节点总数。
    pub fn len(&self) -> usize {
        fn count(nodes: &[CommentNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.roots)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// 以先序展开全部节点 id，用于校验构建的完整性。
    pub fn flatten_ids(&self) -> Vec<Uuid> {
        fn walk(nodes: &[CommentNode], out: &mut Vec<Uuid>) {
            for node in nodes {
                out.push(node.id);
                walk(&node.children, out);
            }
        }
        let mut out = Vec::with_capacity(self.len());
        walk(&self.roots, &mut out);
        out
    }

    /// 把指定节点的点赞数更新为 `likes`，无论它位于哪一层。
    ///
    /// 返回是否找到了该节点。
    pub fn apply_likes(&mut self, id: Uuid, likes: i32) -> bool {
        fn walk(nodes: &mut [CommentNode], id: Uuid, likes: i32) -> bool {
            for node in nodes {
                if node.id == id {
                    node.likes = likes;
                    return true;
                }
                if walk(&mut node.children, id, likes) {
                    return true;
                }
            }
            false
        }
        walk(&mut self.roots, id, likes)
    }
}

/// 点赞持久化的两个原语，隔离具体存储。
pub trait LikeStore {
    type Error;

    /// 一篇文章的全部评论行，按创建时间升序。
    fn comment_rows(
        &self,
        slug: &str,
    ) -> impl std::future::Future<Output = Result<Vec<CommentRow>, Self::Error>>;

    /// 把点赞数写为给定值，返回是否真的有行被更新。
    fn persist_likes(
        &self,
        id: Uuid,
        likes: i32,
    ) -> impl std::future::Future<Output = Result<bool, Self::Error>>;
}

/// 给评论点赞。
///
/// 乐观地在内存树上加一后落库；落库失败或行已消失时不报错，
/// 改为重新拉取并以持久化状态为准返回，保证展示值最终与存储一致。
/// `Ok(None)` 表示评论不在这篇文章的树里，视同不存在。
pub async fn like_comment<S: LikeStore>(
    store: &S,
    slug: &str,
    id: Uuid,
    seen_likes: i32,
) -> Result<Option<(i32, CommentThread)>, S::Error> {
    let rows = store.comment_rows(slug).await?;
    let mut thread = CommentThread::build(rows);
    let next = seen_likes.saturating_add(1).max(0);

    if !thread.apply_likes(id, next) {
        return Ok(None);
    }

    match store.persist_likes(id, next).await {
        Ok(true) => Ok(Some((next, thread))),
        // 更新失败或行已消失：丢弃乐观结果，回到持久化事实
        Ok(false) | Err(_) => {
            let rows = store.comment_rows(slug).await?;
            let likes = rows
                .iter()
                .find(|row| row.id == id)
                .and_then(|row| row.likes)
                .unwrap_or(0)
                .max(0);
            Ok(Some((likes, CommentThread::build(rows))))
        }
    }
}

/// 沿已建立的父链向上查找，`candidate` 是否为 `node` 的祖先位置。
fn is_ancestor(parent_of: &[Option<usize>], mut candidate: usize, node: usize) -> bool {
    loop {
        if candidate == node {
            return true;
        }
        match parent_of[candidate] {
            Some(next) => candidate = next,
            None => return false,
        }
    }
}

fn materialize(
    i: usize,
    slots: &mut Vec<Option<CommentRow>>,
    children_of: &[Vec<usize>],
) -> CommentNode {
    let row = slots[i].take().expect("comment row consumed twice");
    let children = children_of[i]
        .iter()
        .map(|&child| materialize(child, slots, children_of))
        .collect();

    CommentNode {
        id: row.id,
        slug: row.slug,
        name: row.name,
        message: row.message,
        created_at: row.created_at,
        parent_id: row.parent_id,
        // 空点赞数一律视为 0
        likes: row.likes.unwrap_or(0).max(0),
        children,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn row(id: Uuid, parent: Option<Uuid>, at: i64) -> CommentRow {
        CommentRow {
            id,
            slug: "my-post".to_string(),
            name: Some("tester".to_string()),
            message: "hello".to_string(),
            created_at: Some(Utc.timestamp_opt(at, 0).unwrap()),
            parent_id: parent,
            likes: None,
        }
    }

    #[test]
    fn test_build_nested_chain() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let rows = vec![row(a, None, 1), row(b, Some(a), 2), row(c, Some(b), 3)];

        let thread = CommentThread::build(rows);

        assert_eq!(thread.len(), 3);
        assert_eq!(thread.roots().len(), 1);
        assert_eq!(thread.roots()[0].id, a);
        assert_eq!(thread.roots()[0].children[0].id, b);
        assert_eq!(thread.roots()[0].children[0].children[0].id, c);
        // 展开后 id 集合与输入一致
        assert_eq!(thread.flatten_ids(), vec![a, b, c]);
    }

    #[test]
    fn test_children_sorted_by_created_at() {
        let root = Uuid::new_v4();
        let late = Uuid::new_v4();
        let early = Uuid::new_v4();
        // 乱序到达
        let rows = vec![
            row(root, None, 10),
            row(late, Some(root), 30),
            row(early, Some(root), 20),
        ];

        let thread = CommentThread::build(rows);
        let children: Vec<Uuid> = thread.roots()[0].children.iter().map(|n| n.id).collect();
        assert_eq!(children, vec![early, late]);
    }

    #[test]
    fn test_orphan_becomes_root() {
        let a = Uuid::new_v4();
        let dangling = Uuid::new_v4();
        let rows = vec![row(a, None, 1), row(dangling, Some(Uuid::new_v4()), 2)];

        let thread = CommentThread::build(rows);
        assert_eq!(thread.roots().len(), 2);
        assert_eq!(thread.len(), 2);
    }

    #[test]
    fn test_self_parent_becomes_root() {
        let a = Uuid::new_v4();
        let thread = CommentThread::build(vec![row(a, Some(a), 1)]);
        assert_eq!(thread.roots().len(), 1);
        assert!(thread.roots()[0].children.is_empty());
    }

    #[test]
    fn test_mutual_parents_do_not_cycle() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let rows = vec![row(a, Some(b), 1), row(b, Some(a), 2)];

        let thread = CommentThread::build(rows);
        // 后出现的一条被降级为根，节点总数不变
        assert_eq!(thread.len(), 2);
        assert_eq!(thread.roots().len(), 1);
        assert_eq!(thread.roots()[0].id, b);
        assert_eq!(thread.roots()[0].children[0].id, a);
    }

    #[test]
    fn test_apply_likes_at_depth() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut thread = CommentThread::build(vec![row(a, None, 1), {
            let mut r = row(b, Some(a), 2);
            r.likes = Some(3);
            r
        }]);

        assert!(thread.apply_likes(b, 4));
        assert_eq!(thread.roots()[0].children[0].likes, 4);
        assert!(!thread.apply_likes(Uuid::new_v4(), 1));
    }

    /// 内存点赞数据源，持久化行为可按用例配置。
    struct MemoryLikeStore {
        rows: std::cell::RefCell<Vec<CommentRow>>,
        mode: PersistMode,
    }

    enum PersistMode {
        /// 正常写入
        Apply,
        /// 报告没有行被更新
        Missing,
        /// 写入即失败
        Fail,
    }

    impl MemoryLikeStore {
        fn new(rows: Vec<CommentRow>, mode: PersistMode) -> Self {
            Self {
                rows: std::cell::RefCell::new(rows),
                mode,
            }
        }
    }

    impl LikeStore for MemoryLikeStore {
        type Error = &'static str;

        async fn comment_rows(&self, _slug: &str) -> Result<Vec<CommentRow>, Self::Error> {
            Ok(self.rows.borrow().clone())
        }

        async fn persist_likes(&self, id: Uuid, likes: i32) -> Result<bool, Self::Error> {
            match self.mode {
                PersistMode::Apply => {
                    let mut rows = self.rows.borrow_mut();
                    match rows.iter_mut().find(|row| row.id == id) {
                        Some(row) => {
                            row.likes = Some(likes);
                            Ok(true)
                        }
                        None => Ok(false),
                    }
                }
                PersistMode::Missing => Ok(false),
                PersistMode::Fail => Err("storage down"),
            }
        }
    }

    #[tokio::test]
    async fn test_like_comment_persists_increment() {
        let a = Uuid::new_v4();
        let mut r = row(a, None, 1);
        r.likes = Some(3);
        let store = MemoryLikeStore::new(vec![r], PersistMode::Apply);

        let (likes, thread) = like_comment(&store, "my-post", a, 3)
            .await
            .expect("不应出错")
            .expect("评论应存在");

        assert_eq!(likes, 4);
        assert_eq!(thread.roots()[0].likes, 4);
        assert_eq!(store.rows.borrow()[0].likes, Some(4));
    }

    #[tokio::test]
    async fn test_like_comment_failed_persist_returns_stored_value() {
        let a = Uuid::new_v4();
        let mut r = row(a, None, 1);
        r.likes = Some(3);
        let store = MemoryLikeStore::new(vec![r], PersistMode::Fail);

        // 调用方自称看到 7，乐观值 8 在落库失败后被丢弃
        let (likes, thread) = like_comment(&store, "my-post", a, 7)
            .await
            .expect("不应出错")
            .expect("评论应存在");

        assert_eq!(likes, 3, "应回到持久化的点赞数");
        assert_eq!(thread.roots()[0].likes, 3);
        assert_eq!(store.rows.borrow()[0].likes, Some(3));
    }

    #[tokio::test]
    async fn test_like_comment_missing_row_returns_stored_value() {
        let a = Uuid::new_v4();
        let store = MemoryLikeStore::new(vec![row(a, None, 1)], PersistMode::Missing);

        let (likes, _) = like_comment(&store, "my-post", a, 0)
            .await
            .expect("不应出错")
            .expect("评论应存在");

        // 行上没有点赞数按 0 处理
        assert_eq!(likes, 0);
    }

    #[tokio::test]
    async fn test_like_comment_unknown_id_is_none() {
        let a = Uuid::new_v4();
        let store = MemoryLikeStore::new(vec![row(a, None, 1)], PersistMode::Apply);

        let outcome = like_comment(&store, "my-post", Uuid::new_v4(), 0)
            .await
            .expect("不应出错");
        assert!(outcome.is_none());
    }

    #[test]
    fn test_negative_likes_normalized() {
        let a = Uuid::new_v4();
        let mut r = row(a, None, 1);
        r.likes = Some(-5);
        let thread = CommentThread::build(vec![r]);
        assert_eq!(thread.roots()[0].likes, 0);
    }
}
