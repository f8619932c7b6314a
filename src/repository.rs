//! Member data access built on the query factory.

use squad_query::{
    Expr, FromRecord, Page, Pagination, QueryEngine, QueryFactory, QueryResult, SelectOperation,
};
use tracing::debug;

use crate::dto::{MemberSearchCondition, MemberTeamDto};
use crate::entity::{Member, MemberPath, TeamPath};

/// Repository for [`Member`] entities.
#[derive(Debug, Clone)]
pub struct MemberRepository<E: QueryEngine> {
    query: QueryFactory<E>,
    member: MemberPath,
    team: TeamPath,
}

impl<E: QueryEngine> MemberRepository<E> {
    /// Create a repository over `query`.
    pub fn new(query: QueryFactory<E>) -> Self {
        Self {
            query,
            member: MemberPath::default(),
            team: TeamPath::default(),
        }
    }

    /// The factory the repository queries through.
    pub fn query(&self) -> &QueryFactory<E> {
        &self.query
    }

    /// Insert a member and return its generated id.
    pub async fn save(&self, member: &mut Member) -> QueryResult<i64> {
        self.query.persist(member).await
    }

    /// Load a member with its team.
    pub async fn find_by_id(&self, id: i64) -> QueryResult<Option<Member>> {
        self.query
            .select_from(&self.member)
            .left_join(self.member.team(), &self.team)
            .fetch_join()
            .r#where(self.member.id().equals(id))
            .fetch_one_as()
            .await
    }

    /// Every member, by id.
    pub async fn find_all(&self) -> QueryResult<Vec<Member>> {
        self.query
            .select_from(&self.member)
            .order_by(self.member.id().asc())
            .fetch_as()
            .await
    }

    /// Members with exactly this username.
    pub async fn find_by_username(&self, username: &str) -> QueryResult<Vec<Member>> {
        self.query
            .select_from(&self.member)
            .r#where(self.member.username().equals(username))
            .order_by(self.member.id().asc())
            .fetch_as()
            .await
    }

    /// Members matching every present criterion, joined with their team.
    ///
    /// An empty condition returns every member.
    pub async fn search(&self, condition: &MemberSearchCondition) -> QueryResult<Vec<MemberTeamDto>> {
        debug!(?condition, "member search");
        self.search_query(condition).fetch_as().await
    }

    /// One page of [`search`](Self::search) results with the total count.
    pub async fn search_page(
        &self,
        condition: &MemberSearchCondition,
        pagination: Pagination,
    ) -> QueryResult<Page<MemberTeamDto>> {
        debug!(?condition, ?pagination, "member search page");
        let Page {
            items,
            total,
            pagination,
        } = self
            .search_query(condition)
            .paginate(pagination)
            .fetch_page()
            .await?;
        let items = items
            .iter()
            .map(MemberTeamDto::from_record)
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(Page::new(items, total, pagination))
    }

    fn search_query(&self, condition: &MemberSearchCondition) -> SelectOperation<E> {
        let [member_id, username, age, team_id, team_name] = MemberTeamDto::LABELS;
        self.query
            .select([
                Expr::from(self.member.id()).alias(member_id),
                Expr::from(self.member.username()).alias(username),
                Expr::from(self.member.age()).alias(age),
                Expr::from(self.team.id()).alias(team_id),
                Expr::from(self.team.name()).alias(team_name),
            ])
            .from(&self.member)
            .left_join(self.member.team(), &self.team)
            .r#where(condition.filter_for(&self.member, &self.team))
            .order_by(self.member.id().asc())
    }
}
