mod models;
mod postgres;
mod querier;
mod store;

pub use self::{
    models::{
        Backlink, BacklinkUpsert, Blog, BlogSummary, BlogUpsert, Certificate, CertificateUpsert,
        CommentRow, Project, ProjectUpsert, Setting, Skill, SkillUpsert, SlugEntry, WebVital,
    },
    postgres::{Db, init_db_from_env, migrate, new_db_pool},
    querier::Querier,
    store::Store,
};
