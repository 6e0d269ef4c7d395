use super::Session;

/// Screens the app can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Auth,
    Dashboard,
}

/// Resolve which screen to show for a requested one.
/// The dashboard needs a live session; the auth screen is skipped when
/// signed in. A session past its expiry counts as none.
pub fn guard(requested: Route, session: Option<&Session>) -> Route {
    let signed_in = session.is_some_and(|s| !s.is_expired());
    match (requested, signed_in) {
        (Route::Dashboard, false) => Route::Auth,
        (Route::Auth, true) => Route::Dashboard,
        (route, _) => route,
    }
}
