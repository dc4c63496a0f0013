//! Relation resolution: single, recursive, and batched.
//!
//! Relations resolve through the registry at call time, so cyclic
//! declarations (self-referential trees, mutual belongsTo) are fine: the
//! walk is depth-bounded and truncates silently at the bound instead of
//! erroring. Missing foreign keys are defined results (null or an empty
//! list), never errors.

use std::collections::{HashMap, HashSet};

use futures::future::BoxFuture;
use tracing::{debug, instrument, trace};

use ersatz_model::{
    default_foreign_key, ComputeMode, Context, Database, EntityDecl, Filter, OrderBy, Query,
    RelationKind, RelationSpec, Row, Value,
};

use crate::compute::{ComputeCache, ComputedFieldResolver};
use crate::error::Error;
use crate::registry::Registry;

/// Per-call resolution options.
///
/// `take` and `order_by` override a hasMany relation's declared defaults for
/// the relation being resolved directly; nested relations fall back to their
/// declared defaults. `include` holds dot-separated paths such as
/// `"posts.comments"`.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Maximum relation depth; at the bound, hasMany resolves to an empty
    /// list and hasOne/belongsTo to null.
    pub depth: usize,
    /// Dot-separated relation paths to load.
    pub include: Vec<String>,
    /// Override for a hasMany relation's limit.
    pub take: Option<usize>,
    /// Override for a hasMany relation's ordering.
    pub order_by: Option<OrderBy>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            depth: 3,
            include: Vec::new(),
            take: None,
            order_by: None,
        }
    }
}

impl ResolveOptions {
    /// Create options with the default depth of 3.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum relation depth.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Add an include path.
    pub fn with_include(mut self, path: impl Into<String>) -> Self {
        self.include.push(path.into());
        self
    }

    /// Set the hasMany limit override.
    pub fn with_take(mut self, take: usize) -> Self {
        self.take = Some(take);
        self
    }

    /// Set the hasMany ordering override.
    pub fn with_order(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }
}

/// Computed-field resolution wired into the relation walk.
///
/// When present, every nested entity instance the resolver loads gets its
/// computed fields populated through the shared per-request cache.
#[derive(Clone, Copy)]
pub struct ComputeHook<'a> {
    /// Per-request memoization cache.
    pub cache: &'a ComputeCache,
    /// Caller context handed to computed resolvers.
    pub context: Option<&'a Context>,
    /// Resolve or seed mode.
    pub mode: ComputeMode,
}

/// Resolves declared relations against the database capability.
///
/// Borrows the registry for target lookups and the capability for queries,
/// the same way a query executor borrows its storage and catalog. Create one
/// per logical request.
pub struct RelationResolver<'a> {
    registry: &'a Registry,
    database: &'a dyn Database,
    compute: Option<ComputeHook<'a>>,
}

impl<'a> RelationResolver<'a> {
    /// Create a resolver over a registry and a database capability.
    pub fn new(registry: &'a Registry, database: &'a dyn Database) -> Self {
        Self {
            registry,
            database,
            compute: None,
        }
    }

    /// Populate computed fields on every entity instance the walk loads.
    pub fn with_compute(mut self, hook: ComputeHook<'a>) -> Self {
        self.compute = Some(hook);
        self
    }

    /// Resolve one relation of one entity instance.
    ///
    /// Returns `Value::Record`/`Value::Null` for hasOne and belongsTo,
    /// `Value::List` for hasMany. `depth` is the current recursion level;
    /// top-level callers pass 0.
    pub fn resolve<'s>(
        &'s self,
        source: &'s EntityDecl,
        row: &'s Row,
        relation_name: &'s str,
        spec: &'s RelationSpec,
        options: &'s ResolveOptions,
        depth: usize,
    ) -> BoxFuture<'s, Result<Value, Error>> {
        Box::pin(async move {
            if depth >= options.depth {
                trace!(
                    relation = relation_name,
                    depth,
                    "depth bound reached, truncating"
                );
                return Ok(truncated(spec));
            }

            let target = self.registry.require(&spec.target)?;
            let loaded = match spec.kind {
                RelationKind::BelongsTo => self.load_belongs_to(&target, row, spec).await?,
                RelationKind::HasOne => self.load_has_one(source, &target, row, spec).await?,
                RelationKind::HasMany => match &spec.through {
                    Some(join) => {
                        self.load_through(source, &target, row, spec, join, options)
                            .await?
                    }
                    None => self.load_has_many(source, &target, row, spec, options).await?,
                },
            };

            // Nested include paths under this relation, prefix stripped.
            let nested = ResolveOptions {
                depth: options.depth,
                include: nested_paths(&options.include, relation_name),
                take: None,
                order_by: None,
            };

            match loaded {
                Value::Record(mut related) => {
                    self.populate(&target, &mut related, &nested, depth + 1).await?;
                    Ok(Value::Record(related))
                }
                Value::List(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Value::Record(mut related) => {
                                self.populate(&target, &mut related, &nested, depth + 1).await?;
                                out.push(Value::Record(related));
                            }
                            other => out.push(other),
                        }
                    }
                    Ok(Value::List(out))
                }
                other => Ok(other),
            }
        })
    }

    /// Resolve every included and eager relation of one entity instance,
    /// attaching the results onto the row under the relation names.
    #[instrument(skip_all, fields(entity = %decl.name))]
    pub async fn resolve_relations(
        &self,
        decl: &EntityDecl,
        row: &mut Row,
        options: &ResolveOptions,
    ) -> Result<(), Error> {
        self.populate(decl, row, options, 0).await
    }

    fn populate<'s>(
        &'s self,
        decl: &'s EntityDecl,
        row: &'s mut Row,
        options: &'s ResolveOptions,
        depth: usize,
    ) -> BoxFuture<'s, Result<(), Error>> {
        Box::pin(async move {
            let mut names: Vec<&str> = first_segments(&options.include);
            for (name, spec) in &decl.relations {
                if spec.eager && !names.contains(&name.as_str()) {
                    names.push(name.as_str());
                }
            }

            for name in names {
                let spec = decl.relation(name).ok_or_else(|| Error::UnknownRelation {
                    entity: decl.name.clone(),
                    relation: name.to_string(),
                })?;
                let value = self.resolve(decl, row, name, spec, options, depth).await?;
                row.set(name.to_string(), value);
            }

            if let Some(hook) = &self.compute {
                ComputedFieldResolver::new(self.database, hook.cache)
                    .resolve_fields(decl, row, hook.context, hook.mode)
                    .await?;
            }
            Ok(())
        })
    }

    /// Resolve a hasOne/belongsTo relation for many source instances in one
    /// `find_many` instead of one query per instance.
    ///
    /// Collects the distinct join-key values across all sources, issues a
    /// single `In` query, and assigns per source; sources sharing a key
    /// share the fetched record. hasMany falls back to per-instance
    /// resolution, since an `In` filter cannot express top-K-per-group.
    #[instrument(skip_all, fields(entity = %decl.name, relation = relation_name, sources = rows.len()))]
    pub async fn eager_load(
        &self,
        decl: &EntityDecl,
        rows: &mut [Row],
        relation_name: &str,
        spec: &RelationSpec,
        options: &ResolveOptions,
    ) -> Result<(), Error> {
        if spec.is_collection() {
            debug!(
                relation = relation_name,
                "hasMany excluded from batching, resolving per instance"
            );
            for row in rows.iter_mut() {
                let value = self.resolve(decl, row, relation_name, spec, options, 0).await?;
                row.set(relation_name.to_string(), value);
            }
            return Ok(());
        }

        let target = self.registry.require(&spec.target)?;
        // The key read off each source row, and the target field it joins on.
        let (source_key, join_field) = match spec.kind {
            RelationKind::BelongsTo => {
                (spec.resolved_foreign_key(&spec.target), target.id_field.clone())
            }
            RelationKind::HasOne => {
                (decl.id_field.clone(), spec.resolved_foreign_key(&decl.name))
            }
            RelationKind::HasMany => unreachable!("handled above"),
        };

        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for row in rows.iter() {
            if let Some(value) = row.get(&source_key).filter(|v| !v.is_null()) {
                if seen.insert(value.to_string()) {
                    keys.push(value.clone());
                }
            }
        }

        let mut by_key: HashMap<String, Row> = HashMap::new();
        if !keys.is_empty() {
            let query = Query::new().with_filter(Filter::in_values(join_field.clone(), keys));
            let fetched = self.database.find_many(&target.name, query).await?;
            for related in fetched {
                if let Some(key) = related.get(&join_field) {
                    by_key.entry(key.to_string()).or_insert(related);
                }
            }
        }

        for row in rows.iter_mut() {
            let value = row
                .get(&source_key)
                .filter(|v| !v.is_null())
                .and_then(|v| by_key.get(&v.to_string()))
                .cloned()
                .map(Value::Record)
                .unwrap_or(Value::Null);
            row.set(relation_name.to_string(), value);
        }
        Ok(())
    }

    async fn load_belongs_to(
        &self,
        target: &EntityDecl,
        row: &Row,
        spec: &RelationSpec,
    ) -> Result<Value, Error> {
        let fk = spec.resolved_foreign_key(&spec.target);
        let Some(fk_value) = row.get(&fk).filter(|v| !v.is_null()) else {
            // Unset foreign key is a defined null result, no query issued.
            return Ok(Value::Null);
        };
        let query =
            Query::new().with_filter(Filter::eq(target.id_field.clone(), fk_value.clone()));
        Ok(self
            .database
            .find_first(&target.name, query)
            .await?
            .map(Value::Record)
            .unwrap_or(Value::Null))
    }

    async fn load_has_one(
        &self,
        source: &EntityDecl,
        target: &EntityDecl,
        row: &Row,
        spec: &RelationSpec,
    ) -> Result<Value, Error> {
        let fk = spec.resolved_foreign_key(&source.name);
        let Some(id) = source.id_of(row) else {
            return Ok(Value::Null);
        };
        let query = Query::new().with_filter(Filter::eq(fk, id.clone()));
        Ok(self
            .database
            .find_first(&target.name, query)
            .await?
            .map(Value::Record)
            .unwrap_or(Value::Null))
    }

    async fn load_has_many(
        &self,
        source: &EntityDecl,
        target: &EntityDecl,
        row: &Row,
        spec: &RelationSpec,
        options: &ResolveOptions,
    ) -> Result<Value, Error> {
        let fk = spec.resolved_foreign_key(&source.name);
        let Some(id) = source.id_of(row) else {
            return Ok(Value::List(Vec::new()));
        };
        let mut query = Query::new().with_filter(Filter::eq(fk, id.clone()));
        if let Some(order) = options.order_by.clone().or_else(|| spec.order_by.clone()) {
            query = query.with_order(order);
        }
        if let Some(take) = options.take.or(spec.limit) {
            query = query.with_take(take);
        }
        let rows = self.database.find_many(&target.name, query).await?;
        Ok(Value::List(rows.into_iter().map(Value::Record).collect()))
    }

    /// Many-to-many: join rows by the source's key, then targets by id `In`.
    async fn load_through(
        &self,
        source: &EntityDecl,
        target: &EntityDecl,
        row: &Row,
        spec: &RelationSpec,
        join: &str,
        options: &ResolveOptions,
    ) -> Result<Value, Error> {
        let Some(id) = source.id_of(row) else {
            return Ok(Value::List(Vec::new()));
        };
        let source_fk = spec.resolved_foreign_key(&source.name);
        let join_rows = self
            .database
            .find_many(
                join,
                Query::new().with_filter(Filter::eq(source_fk, id.clone())),
            )
            .await?;

        let target_fk = spec
            .through_foreign_key
            .clone()
            .unwrap_or_else(|| default_foreign_key(&target.name));
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for join_row in &join_rows {
            if let Some(value) = join_row.get(&target_fk).filter(|v| !v.is_null()) {
                if seen.insert(value.to_string()) {
                    ids.push(value.clone());
                }
            }
        }
        if ids.is_empty() {
            return Ok(Value::List(Vec::new()));
        }

        let mut query =
            Query::new().with_filter(Filter::in_values(target.id_field.clone(), ids));
        if let Some(order) = options.order_by.clone().or_else(|| spec.order_by.clone()) {
            query = query.with_order(order);
        }
        if let Some(take) = options.take.or(spec.limit) {
            query = query.with_take(take);
        }
        let rows = self.database.find_many(&target.name, query).await?;
        Ok(Value::List(rows.into_iter().map(Value::Record).collect()))
    }
}

/// The silent truncation value at the depth bound.
fn truncated(spec: &RelationSpec) -> Value {
    if spec.is_collection() {
        Value::List(Vec::new())
    } else {
        Value::Null
    }
}

/// Unique first segments of the include paths, in first-appearance order.
fn first_segments(include: &[String]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for path in include {
        let head = path.split('.').next().unwrap_or(path);
        if !head.is_empty() && !out.contains(&head) {
            out.push(head);
        }
    }
    out
}

/// Include paths nested under `prefix`, with the prefix stripped.
fn nested_paths(include: &[String], prefix: &str) -> Vec<String> {
    include
        .iter()
        .filter_map(|path| {
            let rest = path.strip_prefix(prefix)?;
            let rest = rest.strip_prefix('.')?;
            (!rest.is_empty()).then(|| rest.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use ersatz_model::{FieldSpec, FieldType};

    use crate::memory::MemoryDatabase;

    fn blog_registry() -> Registry {
        let registry = Registry::new();
        registry.register(
            EntityDecl::new("User")
                .with_field(FieldSpec::new("id", FieldType::Uuid))
                .with_relation(
                    "posts",
                    RelationSpec::has_many("Post").with_foreign_key("authorId"),
                )
                .with_relation("profile", RelationSpec::has_one("Profile")),
        );
        registry.register(
            EntityDecl::new("Post")
                .with_field(FieldSpec::new("id", FieldType::Uuid))
                .with_relation(
                    "author",
                    RelationSpec::belongs_to("User").with_foreign_key("authorId"),
                )
                .with_relation(
                    "comments",
                    RelationSpec::has_many("Comment").with_order(OrderBy::asc("id")),
                ),
        );
        registry.register(
            EntityDecl::new("Comment")
                .with_field(FieldSpec::new("id", FieldType::Uuid))
                .with_relation("post", RelationSpec::belongs_to("Post")),
        );
        registry.register(
            EntityDecl::new("Profile")
                .with_field(FieldSpec::new("id", FieldType::Uuid))
                .with_relation("user", RelationSpec::belongs_to("User")),
        );
        registry
    }

    fn blog_database() -> MemoryDatabase {
        let db = MemoryDatabase::new();
        db.insert("User", Row::new().with("id", "u1").with("name", "Alice"));
        db.insert("User", Row::new().with("id", "u2").with("name", "Bob"));
        db.insert(
            "Profile",
            Row::new().with("id", "pr1").with("userId", "u1").with("bio", "hi"),
        );
        db.insert(
            "Post",
            Row::new().with("id", "p1").with("authorId", "u1").with("title", "one"),
        );
        db.insert(
            "Post",
            Row::new().with("id", "p2").with("authorId", "u1").with("title", "two"),
        );
        db.insert(
            "Comment",
            Row::new().with("id", "c1").with("postId", "p1").with("text", "nice"),
        );
        db.insert(
            "Comment",
            Row::new().with("id", "c2").with("postId", "p1").with("text", "meh"),
        );
        db
    }

    #[tokio::test]
    async fn test_belongs_to_resolves_single_record() {
        let registry = blog_registry();
        let db = blog_database();
        let resolver = RelationResolver::new(&registry, &db);

        let post = registry.get("Post").unwrap();
        let row = Row::new().with("id", "p1").with("authorId", "u1");
        let spec = post.relation("author").unwrap();

        let value = resolver
            .resolve(&post, &row, "author", spec, &ResolveOptions::new(), 0)
            .await
            .unwrap();
        let author = value.as_record().unwrap();
        assert_eq!(author.get("name").and_then(Value::as_str), Some("Alice"));
    }

    #[tokio::test]
    async fn test_belongs_to_unset_fk_issues_no_query() {
        let registry = blog_registry();
        let db = blog_database();
        let resolver = RelationResolver::new(&registry, &db);

        let post = registry.get("Post").unwrap();
        let spec = post.relation("author").unwrap();

        let row = Row::new().with("id", "p9");
        let value = resolver
            .resolve(&post, &row, "author", spec, &ResolveOptions::new(), 0)
            .await
            .unwrap();
        assert_eq!(value, Value::Null);

        let row = Row::new().with("id", "p9").with("authorId", Value::Null);
        let value = resolver
            .resolve(&post, &row, "author", spec, &ResolveOptions::new(), 0)
            .await
            .unwrap();
        assert_eq!(value, Value::Null);

        assert_eq!(db.query_count(), 0);
    }

    #[tokio::test]
    async fn test_has_one_uses_source_fk_on_target() {
        let registry = blog_registry();
        let db = blog_database();
        let resolver = RelationResolver::new(&registry, &db);

        let user = registry.get("User").unwrap();
        let row = Row::new().with("id", "u1");
        let spec = user.relation("profile").unwrap();

        let value = resolver
            .resolve(&user, &row, "profile", spec, &ResolveOptions::new(), 0)
            .await
            .unwrap();
        let profile = value.as_record().unwrap();
        assert_eq!(profile.get("bio").and_then(Value::as_str), Some("hi"));

        // No match resolves to null, not an error.
        let row = Row::new().with("id", "u2");
        let value = resolver
            .resolve(&user, &row, "profile", spec, &ResolveOptions::new(), 0)
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_has_many_with_take_override() {
        let registry = blog_registry();
        let db = blog_database();
        let resolver = RelationResolver::new(&registry, &db);

        let user = registry.get("User").unwrap();
        let row = Row::new().with("id", "u1");
        let spec = user.relation("posts").unwrap();

        let value = resolver
            .resolve(&user, &row, "posts", spec, &ResolveOptions::new(), 0)
            .await
            .unwrap();
        assert_eq!(value.as_list().unwrap().len(), 2);

        let value = resolver
            .resolve(
                &user,
                &row,
                "posts",
                spec,
                &ResolveOptions::new().with_take(1),
                0,
            )
            .await
            .unwrap();
        assert_eq!(value.as_list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_nested_include_paths() {
        let registry = blog_registry();
        let db = blog_database();
        let resolver = RelationResolver::new(&registry, &db);

        let user = registry.get("User").unwrap();
        let mut row = Row::new().with("id", "u1");
        resolver
            .resolve_relations(
                &user,
                &mut row,
                &ResolveOptions::new().with_include("posts.comments"),
            )
            .await
            .unwrap();

        let posts = row.get("posts").and_then(Value::as_list).unwrap();
        assert_eq!(posts.len(), 2);
        let p1 = posts[0].as_record().unwrap();
        assert_eq!(p1.get("id").and_then(Value::as_str), Some("p1"));
        let comments = p1.get("comments").and_then(Value::as_list).unwrap();
        assert_eq!(comments.len(), 2);
        // The sibling post has no comments but still gets the empty list.
        let p2 = posts[1].as_record().unwrap();
        assert_eq!(p2.get("comments").and_then(Value::as_list).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_depth_bound_truncates_silently() {
        let registry = blog_registry();
        let db = blog_database();
        let resolver = RelationResolver::new(&registry, &db);

        let user = registry.get("User").unwrap();
        let mut row = Row::new().with("id", "u1");
        resolver
            .resolve_relations(
                &user,
                &mut row,
                &ResolveOptions::new()
                    .with_depth(1)
                    .with_include("posts.comments"),
            )
            .await
            .unwrap();

        // posts load at depth 0; comments would load at depth 1, which is
        // the bound, so every post carries an empty list.
        let posts = row.get("posts").and_then(Value::as_list).unwrap();
        assert_eq!(posts.len(), 2);
        for post in posts {
            let comments = post.as_record().unwrap().get("comments").unwrap();
            assert_eq!(comments, &Value::List(Vec::new()));
        }
    }

    #[tokio::test]
    async fn test_cyclic_relations_terminate_via_depth() {
        let registry = blog_registry();
        let db = blog_database();
        let resolver = RelationResolver::new(&registry, &db);

        // posts.author.posts walks the User <-> Post cycle; the default
        // depth of 3 stops it.
        let user = registry.get("User").unwrap();
        let mut row = Row::new().with("id", "u1");
        resolver
            .resolve_relations(
                &user,
                &mut row,
                &ResolveOptions::new().with_include("posts.author.posts"),
            )
            .await
            .unwrap();

        let posts = row.get("posts").and_then(Value::as_list).unwrap();
        let author = posts[0].as_record().unwrap().get("author").unwrap();
        let inner_posts = author.as_record().unwrap().get("posts").unwrap();
        assert_eq!(inner_posts.as_list().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unregistered_target_errors() {
        let registry = Registry::new();
        registry.register(
            EntityDecl::new("Orphan").with_relation("parent", RelationSpec::belongs_to("Ghost")),
        );
        let db = MemoryDatabase::new();
        let resolver = RelationResolver::new(&registry, &db);

        let orphan = registry.get("Orphan").unwrap();
        let row = Row::new().with("id", "o1").with("ghostId", "g1");
        let err = resolver
            .resolve(
                &orphan,
                &row,
                "parent",
                orphan.relation("parent").unwrap(),
                &ResolveOptions::new(),
                0,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotRegistered(name) if name == "Ghost"));
    }

    #[tokio::test]
    async fn test_unknown_include_relation_errors() {
        let registry = blog_registry();
        let db = blog_database();
        let resolver = RelationResolver::new(&registry, &db);

        let user = registry.get("User").unwrap();
        let mut row = Row::new().with("id", "u1");
        let err = resolver
            .resolve_relations(
                &user,
                &mut row,
                &ResolveOptions::new().with_include("followers"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownRelation { relation, .. } if relation == "followers"));
    }

    #[tokio::test]
    async fn test_eager_flag_loads_without_include() {
        let registry = Registry::new();
        registry.register(
            EntityDecl::new("Post").with_relation(
                "author",
                RelationSpec::belongs_to("User")
                    .with_foreign_key("authorId")
                    .eager(),
            ),
        );
        registry.register(EntityDecl::new("User"));
        let db = blog_database();
        let resolver = RelationResolver::new(&registry, &db);

        let post = registry.get("Post").unwrap();
        let mut row = Row::new().with("id", "p1").with("authorId", "u1");
        resolver
            .resolve_relations(&post, &mut row, &ResolveOptions::new())
            .await
            .unwrap();

        let author = row.get("author").and_then(Value::as_record).unwrap();
        assert_eq!(author.get("id").and_then(Value::as_str), Some("u1"));
    }

    #[tokio::test]
    async fn test_through_relation_joins_two_queries() {
        let registry = Registry::new();
        registry.register(
            EntityDecl::new("Post").with_relation(
                "tags",
                RelationSpec::has_many("Tag")
                    .through("PostTag")
                    .with_through_foreign_key("tagId"),
            ),
        );
        registry.register(EntityDecl::new("Tag"));
        registry.register(EntityDecl::new("PostTag"));

        let db = MemoryDatabase::new();
        db.insert("Tag", Row::new().with("id", "t1").with("label", "rust"));
        db.insert("Tag", Row::new().with("id", "t2").with("label", "orm"));
        db.insert("PostTag", Row::new().with("postId", "p1").with("tagId", "t1"));
        db.insert("PostTag", Row::new().with("postId", "p1").with("tagId", "t2"));
        db.insert("PostTag", Row::new().with("postId", "p2").with("tagId", "t2"));

        let resolver = RelationResolver::new(&registry, &db);
        let post = registry.get("Post").unwrap();
        let row = Row::new().with("id", "p1");
        let value = resolver
            .resolve(
                &post,
                &row,
                "tags",
                post.relation("tags").unwrap(),
                &ResolveOptions::new(),
                0,
            )
            .await
            .unwrap();

        let tags = value.as_list().unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(db.query_count(), 2); // join rows, then targets by In
    }

    #[tokio::test]
    async fn test_eager_load_belongs_to_is_one_query() {
        let registry = blog_registry();
        let db = blog_database();
        let resolver = RelationResolver::new(&registry, &db);

        let post = registry.get("Post").unwrap();
        let spec = post.relation("author").unwrap();

        // 50 posts over 3 distinct authors, including a null FK.
        db.insert("User", Row::new().with("id", "u3").with("name", "Carol"));
        let mut rows: Vec<Row> = (0..50)
            .map(|i| {
                let author = match i % 4 {
                    0 => Value::String("u1".into()),
                    1 => Value::String("u2".into()),
                    2 => Value::String("u3".into()),
                    _ => Value::Null,
                };
                Row::new().with("id", format!("p{}", i)).with("authorId", author)
            })
            .collect();

        db.reset_calls();
        resolver
            .eager_load(&post, &mut rows, "author", spec, &ResolveOptions::new())
            .await
            .unwrap();

        let calls = db.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, "find_many");
        match &calls[0].query.filters[0] {
            Filter::In { field, values } => {
                assert_eq!(field, "id");
                assert_eq!(values.len(), 3);
            }
            other => panic!("expected In filter, got {:?}", other),
        }

        for (i, row) in rows.iter().enumerate() {
            match i % 4 {
                0 => assert_eq!(
                    row.get("author").and_then(Value::as_record).and_then(|r| r
                        .get("id")
                        .and_then(Value::as_str)),
                    Some("u1")
                ),
                3 => assert_eq!(row.get("author"), Some(&Value::Null)),
                _ => assert!(row.get("author").and_then(Value::as_record).is_some()),
            }
        }
    }

    #[tokio::test]
    async fn test_eager_load_has_one_keys_by_source_id() {
        let registry = blog_registry();
        let db = blog_database();
        let resolver = RelationResolver::new(&registry, &db);

        let user = registry.get("User").unwrap();
        let spec = user.relation("profile").unwrap();
        let mut rows = vec![Row::new().with("id", "u1"), Row::new().with("id", "u2")];

        db.reset_calls();
        resolver
            .eager_load(&user, &mut rows, "profile", spec, &ResolveOptions::new())
            .await
            .unwrap();

        assert_eq!(db.query_count(), 1);
        assert!(rows[0].get("profile").and_then(Value::as_record).is_some());
        assert_eq!(rows[1].get("profile"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_eager_load_has_many_falls_back_per_instance() {
        let registry = blog_registry();
        let db = blog_database();
        let resolver = RelationResolver::new(&registry, &db);

        let user = registry.get("User").unwrap();
        let spec = user.relation("posts").unwrap();
        let mut rows = vec![Row::new().with("id", "u1"), Row::new().with("id", "u2")];

        db.reset_calls();
        resolver
            .eager_load(&user, &mut rows, "posts", spec, &ResolveOptions::new())
            .await
            .unwrap();

        assert_eq!(db.query_count(), 2); // one per source
        assert_eq!(rows[0].get("posts").and_then(Value::as_list).unwrap().len(), 2);
        assert_eq!(rows[1].get("posts").and_then(Value::as_list).unwrap().len(), 0);
    }

    #[test]
    fn test_include_path_helpers() {
        let include = vec![
            "posts.comments".to_string(),
            "posts".to_string(),
            "profile".to_string(),
        ];
        assert_eq!(first_segments(&include), vec!["posts", "profile"]);
        assert_eq!(nested_paths(&include, "posts"), vec!["comments".to_string()]);
        assert!(nested_paths(&include, "profile").is_empty());
    }
}
