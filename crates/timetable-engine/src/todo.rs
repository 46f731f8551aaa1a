//! Display ordering for a term's todos.

use chrono::NaiveDate;

use crate::model::Todo;

/// Todos by date ascending, then priority descending (high first), then id.
pub fn ordered<'a, I>(todos: I) -> Vec<&'a Todo>
where
    I: IntoIterator<Item = &'a Todo>,
{
    let mut list: Vec<&Todo> = todos.into_iter().collect();
    list.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| b.priority.cmp(&a.priority))
            .then_with(|| a.id.cmp(&b.id))
    });
    list
}

pub fn due_on<'a, I>(todos: I, date: NaiveDate) -> Vec<&'a Todo>
where
    I: IntoIterator<Item = &'a Todo>,
{
    ordered(todos.into_iter().filter(|t| t.date == date))
}

pub fn pending<'a, I>(todos: I) -> Vec<&'a Todo>
where
    I: IntoIterator<Item = &'a Todo>,
{
    ordered(todos.into_iter().filter(|t| !t.completed))
}
